//! Named, bounded tunables.

use crate::prelude::v1::*;

/// Object with named properties that can be listed and overridden.
pub trait Properties {
    /// Get available properties.
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
        vec![]
    }

    fn props(&mut self) -> Vec<(&str, Property)> {
        self.props_mut()
            .into_iter()
            .map(|(n, p)| (n, p.into()))
            .collect()
    }

    /// Parse `value` into the property called `name`.
    ///
    /// The parsed value is clamped to the property's bounds.
    fn set_prop(&mut self, name: &str, value: &str) -> Result<()> {
        let (_, mut prop) = self
            .props_mut()
            .into_iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| anyhow!("unknown property `{name}`"))?;

        prop.parse_set(value)
            .map_err(|e| anyhow!("invalid value `{value}` for `{name}`: {e}"))
    }
}

/// Property with a lower and upper bound.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct BoundedProp<T> {
    pub val: T,
    pub min: T,
    pub max: T,
}

impl<'a, T: Copy> From<BoundedPropMut<'a, T>> for BoundedProp<T> {
    fn from(BoundedPropMut { val, min, max }: BoundedPropMut<'a, T>) -> Self {
        Self {
            val: *val,
            min,
            max,
        }
    }
}

/// Snapshot of a property value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum Property {
    Float(BoundedProp<f64>),
    Usize(BoundedProp<usize>),
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Property::Float(p) => write!(f, "{} [{}..={}]", p.val, p.min, p.max),
            Property::Usize(p) => write!(f, "{} [{}..={}]", p.val, p.min, p.max),
        }
    }
}

impl<'a> From<PropertyMut<'a>> for Property {
    fn from(prop: PropertyMut<'a>) -> Self {
        match prop {
            PropertyMut::Float(p) => Self::Float(p.into()),
            PropertyMut::Usize(p) => Self::Usize(p.into()),
        }
    }
}

/// Mutable reference to a property with a lower and upper bound.
pub struct BoundedPropMut<'a, T> {
    pub val: &'a mut T,
    pub min: T,
    pub max: T,
}

impl<'a, T: PartialOrd + Copy> BoundedPropMut<'a, T> {
    /// Clamp the underlying value between the lower and upper bounds.
    pub fn clamp(&mut self) {
        if *self.val < self.min {
            *self.val = self.min;
        } else if *self.val > self.max {
            *self.val = self.max;
        }
    }
}

/// Mutable reference to a typed property.
pub enum PropertyMut<'a> {
    Float(BoundedPropMut<'a, f64>),
    Usize(BoundedPropMut<'a, usize>),
}

impl<'a> PropertyMut<'a> {
    /// Create a floating point property.
    ///
    /// # Arguments
    ///
    /// * `val` - reference to the underlying float to be mutated.
    /// * `min` - lowest value for the property.
    /// * `max` - highest value for the property.
    pub fn float(val: &'a mut f64, min: f64, max: f64) -> Self {
        Self::Float(BoundedPropMut { val, min, max })
    }

    /// Create an integer property.
    ///
    /// # Arguments
    ///
    /// * `val` - reference to the underlying usize to be mutated.
    /// * `min` - lowest value for the property.
    /// * `max` - highest value for the property.
    pub fn usize(val: &'a mut usize, min: usize, max: usize) -> Self {
        Self::Usize(BoundedPropMut { val, min, max })
    }

    /// Parse a textual value into the property and clamp it.
    pub fn parse_set(&mut self, value: &str) -> Result<()> {
        match self {
            Self::Float(val) => {
                let parsed: f64 = value.trim().parse()?;
                if !parsed.is_finite() {
                    return Err(anyhow!("value must be finite"));
                }
                *val.val = parsed;
                val.clamp();
            }
            Self::Usize(val) => {
                *val.val = value.trim().parse()?;
                val.clamp();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tunables {
        gain: f64,
        taps: usize,
    }

    impl Properties for Tunables {
        fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
            vec![
                ("gain", PropertyMut::float(&mut self.gain, 0.0, 2.0)),
                ("taps", PropertyMut::usize(&mut self.taps, 1, 64)),
            ]
        }
    }

    #[test]
    fn set_by_name() {
        let mut t = Tunables { gain: 1.0, taps: 8 };

        t.set_prop("gain", "0.5").unwrap();
        t.set_prop("taps", " 16 ").unwrap();

        assert_eq!(t.gain, 0.5);
        assert_eq!(t.taps, 16);
    }

    #[test]
    fn values_are_clamped() {
        let mut t = Tunables { gain: 1.0, taps: 8 };

        t.set_prop("gain", "-3").unwrap();
        t.set_prop("taps", "1000").unwrap();

        assert_eq!(t.gain, 0.0);
        assert_eq!(t.taps, 64);
    }

    #[test]
    fn bad_input_is_rejected() {
        let mut t = Tunables { gain: 1.0, taps: 8 };

        assert!(t.set_prop("missing", "1").is_err());
        assert!(t.set_prop("taps", "-1").is_err());
        assert!(t.set_prop("gain", "NaN").is_err());
        assert_eq!(t.gain, 1.0);
        assert_eq!(t.taps, 8);
    }

    #[test]
    fn snapshot_reflects_values() {
        let mut t = Tunables { gain: 1.5, taps: 4 };
        let props = t.props();

        assert_eq!(
            props[0],
            (
                "gain",
                Property::Float(BoundedProp {
                    val: 1.5,
                    min: 0.0,
                    max: 2.0
                })
            )
        );
        assert_eq!(props[1].1.to_string(), "4 [1..=64]");
    }
}
