//! Transverse Mercator to geographic coordinate conversion.
//!
//! Inverse Gauss-Krüger projection using the Krüger series to order 4 in the
//! third flattening `n`. The default parameters are SWEREF 99 TM, the grid
//! the municipal feed publishes its geometries in.


/// Projection parameters for a transverse Mercator grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransverseMercator {
    /// Semi-major axis of the ellipsoid (metres)
    pub axis: f64,
    /// Ellipsoid flattening
    pub flattening: f64,
    /// Central meridian (degrees east)
    pub central_meridian: f64,
    /// Scale factor on the central meridian
    pub scale: f64,
    pub false_northing: f64,
    pub false_easting: f64,
}

/// SWEREF 99 TM on the GRS 80 ellipsoid.
pub const SWEREF99_TM: TransverseMercator = TransverseMercator {
    axis: 6_378_137.0,
    flattening: 1.0 / 298.257_222_101,
    central_meridian: 15.0,
    scale: 0.9996,
    false_northing: 0.0,
    false_easting: 500_000.0,
};

impl Default for TransverseMercator {
    fn default() -> Self {
        SWEREF99_TM
    }
}

impl TransverseMercator {
    /// Converts a grid position to `(longitude, latitude)` in degrees.
    pub fn to_geographic(&self, easting: f64, northing: f64) -> (f64, f64) {
        let f = self.flattening;
        let e2 = f * (2.0 - f);
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;

        // Rectifying radius
        let a_roof = self.axis / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0);

        let delta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0,
            4397.0 * n4 / 161_280.0,
        ];

        // Conformal latitude back to geodetic latitude
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let e8 = e6 * e2;
        let a_star = e2 + e4 + e6 + e8;
        let b_star = -(7.0 * e4 + 17.0 * e6 + 30.0 * e8) / 6.0;
        let c_star = (224.0 * e6 + 889.0 * e8) / 120.0;
        let d_star = -(4279.0 * e8) / 1260.0;

        let lambda_zero = self.central_meridian.to_radians();
        let xi = (northing - self.false_northing) / (self.scale * a_roof);
        let eta = (easting - self.false_easting) / (self.scale * a_roof);

        let mut xi_prim = xi;
        let mut eta_prim = eta;
        for (j, d) in delta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_prim -= d * (k * xi).sin() * (k * eta).cosh();
            eta_prim -= d * (k * xi).cos() * (k * eta).sinh();
        }

        let phi_star = (xi_prim.sin() / eta_prim.cosh()).asin();
        let delta_lambda = (eta_prim.sinh() / xi_prim.cos()).atan();

        let sin_phi = phi_star.sin();
        let s2 = sin_phi * sin_phi;
        let lat = phi_star
            + sin_phi
                * phi_star.cos()
                * (a_star + b_star * s2 + c_star * s2 * s2 + d_star * s2 * s2 * s2);
        let lon = lambda_zero + delta_lambda;

        (lon.to_degrees(), lat.to_degrees())
    }
}

/// Projects a SWEREF 99 TM position to `(longitude, latitude)`.
#[inline]
pub fn project(easting: f64, northing: f64) -> (f64, f64) {
    SWEREF99_TM.to_geographic(easting, northing)
}
