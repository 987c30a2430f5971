//! Per-body surface properties and how a contacting pair combines them.

use rb_math::Fph;

/// Restitution and friction coefficients for one body.
///
/// Combination is always a plain product (`eA*eB`, `muA*muB`): every
/// place the simulation needs a combined coefficient uses this form,
/// not a max/sqrt blend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub restitution: Fph,
    pub friction: Fph,
}

impl Material {
    pub fn new(restitution: Fph, friction: Fph) -> Self {
        Self {
            restitution: restitution.clamp(0.0, 1.0),
            friction: friction.clamp(0.0, 1.0),
        }
    }

    pub fn combined_restitution(a: Fph, b: Fph) -> Fph {
        a * b
    }

    pub fn combined_friction(a: Fph, b: Fph) -> Fph {
        a * b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combination_is_a_plain_product() {
        assert_eq!(Material::combined_restitution(0.5, 0.5), 0.25);
        assert_eq!(Material::combined_friction(0.8, 0.5), 0.4);
    }
}
