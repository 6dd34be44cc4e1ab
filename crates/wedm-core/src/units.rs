// wedm-core/src/units.rs
//
// The kernel stores lengths in µm (gap scale) and mm (wire / workpiece scale)
// and time in integer µs. These constructors keep the conversions to SI in
// one place so derived constants are computed with checked dimensions.

use uom::si::f64::{
    Area as UomArea, Length as UomLength, Time as UomTime, Velocity as UomVelocity,
    Volume as UomVolume,
};

// Public canonical unit types (SI, f64)
pub type Area = UomArea;
pub type Length = UomLength;
pub type Time = UomTime;
pub type Velocity = UomVelocity;
pub type Volume = UomVolume;

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

#[inline]
pub fn um(v: f64) -> Length {
    use uom::si::length::micrometer;
    Length::new::<micrometer>(v)
}

#[inline]
pub fn us(v: f64) -> Time {
    use uom::si::time::microsecond;
    Time::new::<microsecond>(v)
}

/// Velocity given in µm per µs (numerically equal to m/s).
#[inline]
pub fn um_per_us(v: f64) -> Velocity {
    um(v) / us(1.0)
}

#[inline]
pub fn to_m(l: Length) -> f64 {
    use uom::si::length::meter;
    l.get::<meter>()
}

#[inline]
pub fn to_um(l: Length) -> f64 {
    use uom::si::length::micrometer;
    l.get::<micrometer>()
}

#[inline]
pub fn to_m2(a: Area) -> f64 {
    use uom::si::area::square_meter;
    a.get::<square_meter>()
}

#[inline]
pub fn to_um3(v: Volume) -> f64 {
    use uom::si::volume::cubic_meter;
    v.get::<cubic_meter>() * 1e18
}

#[inline]
pub fn to_s(t: Time) -> f64 {
    use uom::si::time::second;
    t.get::<second>()
}

#[inline]
pub fn to_mps(v: Velocity) -> f64 {
    use uom::si::velocity::meter_per_second;
    v.get::<meter_per_second>()
}

pub mod constants {
    /// Reference temperature for resistivity data (20 °C).
    pub const T_REF_K: f64 = 293.15;

    /// One base physics step.
    pub const BASE_STEP_US: u64 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_conversions() {
        assert!((to_m(mm(1.0)) - 1e-3).abs() < 1e-15);
        assert!((to_um(mm(0.25)) - 250.0).abs() < 1e-9);
        assert!((to_s(us(1.0)) - 1e-6).abs() < 1e-18);
        assert!((to_mps(um_per_us(0.1)) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn derived_area_and_volume() {
        let r = mm(0.125);
        let area = r * r;
        assert!((to_m2(area) - 1.5625e-8).abs() < 1e-20);

        let v = um(2.0) * um(3.0) * um(4.0);
        assert!((to_um3(v) - 24.0).abs() < 1e-9);
    }
}
