//! Synthetic radar data for tests.
//!
//! Sweeps are row-major `rays x bins` arrays, matching the layout of an
//! ODIM_H5 scan layer.

/// Raw `u8` sweep with predictable values: `(ray + bin) % 256`.
///
/// ```
/// use test_utils::create_raw_sweep;
///
/// let sweep = create_raw_sweep(4, 3);
/// assert_eq!(sweep.len(), 12);
/// assert_eq!(sweep[0], 0);
/// assert_eq!(sweep[3], 1); // ray 1, bin 0
/// assert_eq!(sweep[5], 3); // ray 1, bin 2
/// ```
pub fn create_raw_sweep(rays: usize, bins: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(rays * bins);
    for ray in 0..rays {
        for bin in 0..bins {
            data.push(((ray + bin) % 256) as u8);
        }
    }
    data
}

/// Reflectivity sweep in dBZ.
///
/// A single storm cell centred on ray `rays / 4` at half range, peaking at
/// 55 dBZ over a -10 dBZ background.
pub fn create_reflectivity_sweep(rays: usize, bins: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(rays * bins);
    let cell_ray = rays as f64 / 4.0;
    let cell_bin = bins as f64 / 2.0;
    let ray_width = (rays as f64 / 16.0).max(1.0);
    let bin_width = (bins as f64 / 8.0).max(1.0);

    for ray in 0..rays {
        for bin in 0..bins {
            let dr = (ray as f64 - cell_ray) / ray_width;
            let db = (bin as f64 - cell_bin) / bin_width;
            let weight = (-(dr * dr + db * db)).exp();
            data.push(-10.0 + 65.0 * weight);
        }
    }
    data
}

/// Radial velocity sweep in m/s for a uniform wind.
///
/// A wind of `speed` m/s blowing towards azimuth `towards` degrees gives
/// `speed * cos(azimuth - towards)` along each ray.
pub fn create_velocity_sweep(rays: usize, bins: usize, speed: f64, towards: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(rays * bins);
    for ray in 0..rays {
        let azimuth = ray as f64 * 360.0 / rays.max(1) as f64;
        let radial = speed * (azimuth - towards).to_radians().cos();
        data.extend(std::iter::repeat(radial).take(bins));
    }
    data
}

/// Replace every `stride`-th sample with NaN, starting at index 0.
pub fn with_gaps(mut data: Vec<f64>, stride: usize) -> Vec<f64> {
    if stride == 0 {
        return data;
    }
    for value in data.iter_mut().step_by(stride) {
        *value = f64::NAN;
    }
    data
}

/// Wind speed by height level for a vertical profile, in m/s.
///
/// Increases linearly from `surface` by `shear` per level.
pub fn create_wind_profile(levels: usize, surface: f64, shear: f64) -> Vec<f64> {
    (0..levels).map(|level| surface + shear * level as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sweep_wraps() {
        let sweep = create_raw_sweep(300, 1);
        assert_eq!(sweep[255], 255);
        assert_eq!(sweep[256], 0);
    }

    #[test]
    fn test_reflectivity_sweep_peaks_at_cell() {
        let (rays, bins) = (360, 200);
        let sweep = create_reflectivity_sweep(rays, bins);
        let peak = sweep.iter().cloned().fold(f64::MIN, f64::max);
        assert!((peak - 55.0).abs() < 1e-9);
        assert!((sweep[90 * bins + 100] - 55.0).abs() < 1e-9);
        assert!(sweep[270 * bins] < -9.0);
    }

    #[test]
    fn test_velocity_sweep_sign() {
        let sweep = create_velocity_sweep(4, 2, 10.0, 0.0);
        assert!((sweep[0] - 10.0).abs() < 1e-9);
        assert!(sweep[2].abs() < 1e-9);
        assert!((sweep[4] + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_with_gaps() {
        let data = with_gaps(vec![1.0; 5], 2);
        assert!(data[0].is_nan());
        assert_eq!(data[1], 1.0);
        assert!(data[4].is_nan());
        assert_eq!(with_gaps(vec![1.0], 0), vec![1.0]);
    }

    #[test]
    fn test_wind_profile() {
        assert_eq!(create_wind_profile(3, 2.0, 0.5), vec![2.0, 2.5, 3.0]);
    }
}
