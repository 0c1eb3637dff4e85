//! Radar sites, scan geometries and packing parameters seen in real
//! ODIM_H5 products.

/// Radar sites as `(latitude, longitude, height)` in degrees and metres.
pub mod site {
    /// Vantaa, Finland (`fivan`)
    pub const VANTAA: (f64, f64, f64) = (60.2706, 24.869, 83.0);

    /// Emden, Germany (`deemd`)
    pub const EMDEN: (f64, f64, f64) = (53.3394, 7.0248, 58.0);
}

/// Polar scan geometries.
pub mod scan {
    /// Geometry of one sweep.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ScanGeometry {
        /// Elevation angle in degrees
        pub elangle: f64,
        pub nrays: usize,
        pub nbins: usize,
        /// Start of the first bin in km
        pub rstart: f64,
        /// Bin length in metres
        pub rscale: f64,
    }

    impl ScanGeometry {
        pub const fn element_count(&self) -> usize {
            self.nrays * self.nbins
        }

        pub fn dims(&self) -> Vec<usize> {
            vec![self.nrays, self.nbins]
        }
    }

    /// Lowest operational sweep, 1 degree rays and 500 m bins.
    pub const LOWEST: ScanGeometry = ScanGeometry {
        elangle: 0.5,
        nrays: 360,
        nbins: 500,
        rstart: 0.0,
        rscale: 500.0,
    };

    /// A high sweep with short range.
    pub const HIGH: ScanGeometry = ScanGeometry {
        elangle: 10.5,
        nrays: 360,
        nbins: 100,
        rstart: 0.0,
        rscale: 1000.0,
    };

    /// Tiny geometry for fast tests.
    pub const TINY: ScanGeometry = ScanGeometry {
        elangle: 1.0,
        nrays: 4,
        nbins: 4,
        rstart: 0.0,
        rscale: 250.0,
    };

    /// A typical volume, lowest sweep first.
    pub const VOLUME: [ScanGeometry; 3] = [
        LOWEST,
        ScanGeometry {
            elangle: 1.5,
            nrays: 360,
            nbins: 500,
            rstart: 0.0,
            rscale: 500.0,
        },
        HIGH,
    ];
}

/// Packing parameters as `(gain, offset, nodata, undetect)`.
pub mod packing {
    /// Reflectivity in `u8`: -32 dBZ to 95.5 dBZ in 0.5 dB steps.
    pub const DBZH_U8: (f64, f64, f64, f64) = (0.5, -32.0, 255.0, 0.0);

    /// Reflectivity in `u16`.
    pub const DBZH_U16: (f64, f64, f64, f64) = (0.01, -327.68, 65535.0, 0.0);

    /// Radial velocity in `u8` with a 48 m/s Nyquist interval.
    pub const VRADH_U8: (f64, f64, f64, f64) = (0.375, -48.0, 255.0, 0.0);
}

/// Nominal timestamps as `(date, time)` strings.
pub mod timestamps {
    pub const NOMINAL: (&str, &str) = ("20240315", "120000");
    pub const MIDNIGHT: (&str, &str) = ("20231231", "235959");
}
