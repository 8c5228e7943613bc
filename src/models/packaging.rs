use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Default slot cost applied when a packaging type has no configured cost row.
pub const DEFAULT_SLOT_COST: Decimal = dec!(1.0);

/// Default physical dimensions substituted for items with no recorded
/// weight/volume. Fallback policy inherited from the planning side: items
/// without physical data are assumed to be a 10 kg / 0.05 m³ parcel.
pub const DEFAULT_ITEM_WEIGHT_KG: Decimal = dec!(10);
pub const DEFAULT_ITEM_VOLUME_M3: Decimal = dec!(0.05);

/// Enum representing the packaging tiers an item can be assigned to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PackagingType {
    #[sea_orm(string_value = "bag_s")]
    BagS,
    #[sea_orm(string_value = "box_m")]
    BoxM,
    #[sea_orm(string_value = "box_l")]
    BoxL,
    #[sea_orm(string_value = "crate_xl")]
    CrateXl,
}

/// Classifies a single item into a packaging tier from its unit weight (kg)
/// and unit volume (m³).
///
/// Pure and deterministic: the same inputs always yield the same tier,
/// irrespective of call order or concurrent invocation, so results are safe to
/// cache. Tiers are checked largest-first; within a tier the weight threshold
/// is evaluated before the volume threshold, and exceeding either promotes the
/// item to that tier.
pub fn classify_packaging(weight_kg: Decimal, volume_m3: Decimal) -> PackagingType {
    if weight_kg > dec!(30) || volume_m3 > dec!(0.12) {
        PackagingType::CrateXl
    } else if weight_kg > dec!(15) || volume_m3 > dec!(0.05) {
        PackagingType::BoxL
    } else if weight_kg > dec!(5) || volume_m3 > dec!(0.02) {
        PackagingType::BoxM
    } else {
        PackagingType::BagS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_fixed_points() {
        // Threshold values themselves do not promote; only exceeding them does
        assert_eq!(
            classify_packaging(dec!(30.0), dec!(0.10)),
            PackagingType::BoxL
        );
        assert_eq!(
            classify_packaging(dec!(30.1), dec!(0.0)),
            PackagingType::CrateXl
        );
        assert_eq!(
            classify_packaging(dec!(0.0), dec!(0.13)),
            PackagingType::CrateXl
        );
        assert_eq!(classify_packaging(dec!(2), dec!(0.01)), PackagingType::BagS);
    }

    #[test]
    fn either_threshold_promotes_independently() {
        assert_eq!(
            classify_packaging(dec!(16), dec!(0.001)),
            PackagingType::BoxL
        );
        assert_eq!(classify_packaging(dec!(1), dec!(0.06)), PackagingType::BoxL);
        assert_eq!(classify_packaging(dec!(6), dec!(0.001)), PackagingType::BoxM);
        assert_eq!(classify_packaging(dec!(1), dec!(0.03)), PackagingType::BoxM);
    }

    #[test]
    fn classifier_is_deterministic_across_calls() {
        for _ in 0..100 {
            assert_eq!(
                classify_packaging(dec!(8), dec!(0.04)),
                PackagingType::BoxM
            );
        }
    }

    #[test]
    fn wire_values_are_snake_case() {
        assert_eq!(PackagingType::CrateXl.to_string(), "crate_xl");
        assert_eq!(PackagingType::BagS.to_string(), "bag_s");
    }
}
