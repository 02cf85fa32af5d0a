// Booking price estimator
// A pure mapping from a booking configuration to a price breakdown, cheap enough to run on every keystroke

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ADD_ON_PRICE: f64 = 25.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseOptionError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "standard-cleaning")]
    Standard,
    #[serde(rename = "deep-cleaning")]
    Deep,
    #[serde(rename = "move-in-out")]
    MoveInOut,
    #[serde(rename = "white-glove")]
    WhiteGlove,
    #[serde(rename = "airbnb-turnover")]
    AirbnbTurnover,
    #[serde(rename = "custom-clean")]
    Custom,
}

impl ServiceType {
    pub const ALL: [ServiceType; 6] = [
        ServiceType::Standard,
        ServiceType::Deep,
        ServiceType::MoveInOut,
        ServiceType::WhiteGlove,
        ServiceType::AirbnbTurnover,
        ServiceType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Standard => "standard-cleaning",
            ServiceType::Deep => "deep-cleaning",
            ServiceType::MoveInOut => "move-in-out",
            ServiceType::WhiteGlove => "white-glove",
            ServiceType::AirbnbTurnover => "airbnb-turnover",
            ServiceType::Custom => "custom-clean",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Standard => "Standard Cleaning",
            ServiceType::Deep => "Deep Cleaning",
            ServiceType::MoveInOut => "Move In / Move Out Cleaning",
            ServiceType::WhiteGlove => "White Glove Cleaning",
            ServiceType::AirbnbTurnover => "Airbnb Turnover Cleaning",
            ServiceType::Custom => "Custom Cleaning",
        }
    }

    // Catalogue lines shown beside the estimator: (label, price text)
    pub fn pricing_summary(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ServiceType::Standard => &[
                ("Studio / 1 Bed - 1 Bath", "$130"),
                ("2 Beds - 1 Bath", "$180"),
                ("2 Beds - 2 Baths", "$230"),
                ("3 Beds - 2 Baths", "$290"),
                ("Over 1500 sq. ft", "$0.18 / sq ft"),
            ],
            ServiceType::Deep => &[("Per sq. ft", "$0.23 / sq ft")],
            ServiceType::MoveInOut => &[
                ("Studio / 1 Bed - 1 Bath", "$250"),
                ("2 Beds - 1 Bath", "$290"),
                ("2 Beds - 2 Baths", "$325"),
                ("3 Beds - 2 Baths", "$350"),
                ("Over 1500 sq. ft", "$0.30 / sq ft"),
            ],
            ServiceType::WhiteGlove => &[
                ("Starting Flat Rate", "$200"),
                ("Per Bedroom / Bathroom", "+$50 each"),
                ("Over 2000 sq. ft", "$0.20 / sq ft"),
            ],
            ServiceType::AirbnbTurnover => &[
                ("1 Bed / 1 Bath", "$140"),
                ("Each Extra Room", "+$40"),
                ("Over 1200 sq. ft", "$0.23 / sq ft"),
            ],
            ServiceType::Custom => &[("Flat Rate", "$130"), ("Add-ons", "+$25 each")],
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ParseOptionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "standard-cleaning" | "standard" => Ok(ServiceType::Standard),
            "deep-cleaning" | "deep" => Ok(ServiceType::Deep),
            "move-in-out" => Ok(ServiceType::MoveInOut),
            "white-glove" => Ok(ServiceType::WhiteGlove),
            "airbnb-turnover" | "airbnb" => Ok(ServiceType::AirbnbTurnover),
            "custom-clean" | "custom" => Ok(ServiceType::Custom),
            other => Err(ParseOptionError {
                kind: "service type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomTier {
    #[serde(rename = "studio")]
    Studio,
    #[serde(rename = "2-bed-1-bath")]
    TwoBedOneBath,
    #[serde(rename = "2-bed-2-bath")]
    TwoBedTwoBath,
    #[serde(rename = "3-bed-2-bath")]
    ThreeBedTwoBath,
    #[serde(rename = "1500-sqft-plus")]
    Large,
}

impl RoomTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomTier::Studio => "studio",
            RoomTier::TwoBedOneBath => "2-bed-1-bath",
            RoomTier::TwoBedTwoBath => "2-bed-2-bath",
            RoomTier::ThreeBedTwoBath => "3-bed-2-bath",
            RoomTier::Large => "1500-sqft-plus",
        }
    }
}

impl fmt::Display for RoomTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecurrencePlan {
    OneTime,
    Weekly,
    BiWeekly,
    Monthly,
}

impl RecurrencePlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrencePlan::OneTime => "one-time",
            RecurrencePlan::Weekly => "weekly",
            RecurrencePlan::BiWeekly => "bi-weekly",
            RecurrencePlan::Monthly => "monthly",
        }
    }

    // Share of the base price taken off for a repeating booking
    pub fn discount_rate(&self) -> f64 {
        match self {
            RecurrencePlan::OneTime => 0.0,
            RecurrencePlan::Weekly => 0.15,
            RecurrencePlan::BiWeekly => 0.10,
            RecurrencePlan::Monthly => 0.05,
        }
    }
}

impl FromStr for RecurrencePlan {
    type Err = ParseOptionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "one-time" => Ok(RecurrencePlan::OneTime),
            "weekly" => Ok(RecurrencePlan::Weekly),
            "bi-weekly" => Ok(RecurrencePlan::BiWeekly),
            "monthly" => Ok(RecurrencePlan::Monthly),
            other => Err(ParseOptionError {
                kind: "recurrence plan",
                value: other.to_string(),
            }),
        }
    }
}

// Bucket a home into a pricing tier. Every combination that is not one of the
// four named layouts lands in Large, including 1 bed / 2 bath.
pub fn derive_room_tier(bedrooms: u32, bathrooms: u32) -> RoomTier {
    match (bedrooms, bathrooms) {
        (1, 1) => RoomTier::Studio,
        (2, 1) => RoomTier::TwoBedOneBath,
        (2, 2) => RoomTier::TwoBedTwoBath,
        (3, 2) => RoomTier::ThreeBedTwoBath,
        _ => RoomTier::Large,
    }
}

// Square footage typed into a form: empty, garbage, zero or negative means "not given"
pub fn parse_square_footage(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().and_then(sanitize_square_footage)
}

fn sanitize_square_footage(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

struct TierRates {
    studio: f64,
    two_bed_one_bath: f64,
    two_bed_two_bath: f64,
    three_bed_two_bath: f64,
    large_per_sqft: f64,
}

const STANDARD_RATES: TierRates = TierRates {
    studio: 130.0,
    two_bed_one_bath: 180.0,
    two_bed_two_bath: 230.0,
    three_bed_two_bath: 290.0,
    large_per_sqft: 0.18,
};

const MOVE_IN_OUT_RATES: TierRates = TierRates {
    studio: 250.0,
    two_bed_one_bath: 290.0,
    two_bed_two_bath: 325.0,
    three_bed_two_bath: 350.0,
    large_per_sqft: 0.30,
};

impl TierRates {
    fn price(&self, tier: Option<RoomTier>, square_footage: Option<f64>) -> f64 {
        match tier {
            None => 0.0,
            Some(RoomTier::Studio) => self.studio,
            Some(RoomTier::TwoBedOneBath) => self.two_bed_one_bath,
            Some(RoomTier::TwoBedTwoBath) => self.two_bed_two_bath,
            Some(RoomTier::ThreeBedTwoBath) => self.three_bed_two_bath,
            // Large homes never drop below the 3-bed flat rate
            Some(RoomTier::Large) => square_footage.map_or(0.0, |sqft| {
                self.three_bed_two_bath.max(sqft * self.large_per_sqft)
            }),
        }
    }
}

fn extra_rooms(count: Option<u32>) -> f64 {
    count.map_or(0, |c| c.saturating_sub(1)) as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    base_price: f64,
    add_ons_price: f64,
    discount_amount: f64,
    total_price: f64,
}

impl PriceBreakdown {
    // Discount is clamped into [0, base] so the total can never go negative
    pub fn new(base_price: f64, add_ons_price: f64, discount_amount: f64) -> Self {
        let base_price = non_negative(base_price);
        let add_ons_price = non_negative(add_ons_price);
        let discount_amount = non_negative(discount_amount).min(base_price);

        Self {
            base_price,
            add_ons_price,
            discount_amount,
            total_price: base_price + add_ons_price - discount_amount,
        }
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    pub fn add_ons_price(&self) -> f64 {
        self.add_ons_price
    }

    pub fn discount_amount(&self) -> f64 {
        self.discount_amount
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

// Everything the customer picks that can move the price
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingConfiguration {
    service_type: Option<ServiceType>,
    room_tier: Option<RoomTier>,
    square_footage: Option<f64>,
    bedrooms: Option<u32>,
    bathrooms: Option<u32>,
    add_ons: Vec<String>,
    recurrence: Option<RecurrencePlan>,
}

impl BookingConfiguration {
    pub fn new(service_type: ServiceType) -> Self {
        Self {
            service_type: Some(service_type),
            ..Default::default()
        }
    }

    pub fn with_rooms(mut self, bedrooms: u32, bathrooms: u32) -> Self {
        self.set_bedrooms(Some(bedrooms));
        self.set_bathrooms(Some(bathrooms));
        self
    }

    pub fn with_square_footage(mut self, square_footage: f64) -> Self {
        self.set_square_footage(Some(square_footage));
        self
    }

    pub fn with_add_ons<I, S>(mut self, add_ons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for add_on in add_ons {
            self.add_add_on(add_on);
        }
        self
    }

    pub fn with_recurrence(mut self, recurrence: RecurrencePlan) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn service_type(&self) -> Option<ServiceType> {
        self.service_type
    }

    pub fn room_tier(&self) -> Option<RoomTier> {
        self.room_tier
    }

    pub fn square_footage(&self) -> Option<f64> {
        self.square_footage
    }

    pub fn bedrooms(&self) -> Option<u32> {
        self.bedrooms
    }

    pub fn bathrooms(&self) -> Option<u32> {
        self.bathrooms
    }

    pub fn add_ons(&self) -> &[String] {
        &self.add_ons
    }

    pub fn recurrence(&self) -> Option<RecurrencePlan> {
        self.recurrence
    }

    pub fn set_service_type(&mut self, service_type: Option<ServiceType>) {
        self.service_type = service_type;
    }

    pub fn set_bedrooms(&mut self, bedrooms: Option<u32>) {
        self.bedrooms = bedrooms.filter(|count| *count > 0);
        self.rederive_tier();
    }

    pub fn set_bathrooms(&mut self, bathrooms: Option<u32>) {
        self.bathrooms = bathrooms.filter(|count| *count > 0);
        self.rederive_tier();
    }

    pub fn set_square_footage(&mut self, square_footage: Option<f64>) {
        self.square_footage = square_footage.and_then(sanitize_square_footage);
    }

    pub fn set_square_footage_text(&mut self, input: &str) {
        self.square_footage = parse_square_footage(input);
    }

    // Returns false when the add-on was already selected
    pub fn add_add_on(&mut self, add_on: impl Into<String>) -> bool {
        let add_on = add_on.into();
        if self.add_ons.contains(&add_on) {
            return false;
        }
        self.add_ons.push(add_on);
        true
    }

    pub fn remove_add_on(&mut self, add_on: &str) -> bool {
        let before = self.add_ons.len();
        self.add_ons.retain(|selected| selected != add_on);
        self.add_ons.len() != before
    }

    // Checkbox handler: checked adds, unchecked removes
    pub fn toggle_add_on(&mut self, add_on: &str, checked: bool) {
        if checked {
            self.add_add_on(add_on);
        } else {
            self.remove_add_on(add_on);
        }
    }

    pub fn set_recurrence(&mut self, recurrence: Option<RecurrencePlan>) {
        self.recurrence = recurrence;
    }

    fn rederive_tier(&mut self) {
        self.room_tier = match (self.bedrooms, self.bathrooms) {
            (Some(bedrooms), Some(bathrooms)) => Some(derive_room_tier(bedrooms, bathrooms)),
            _ => None,
        };
    }

    pub fn base_price(&self) -> f64 {
        let Some(service_type) = self.service_type else {
            return 0.0;
        };
        let sqft = self.square_footage;

        match service_type {
            ServiceType::Standard => STANDARD_RATES.price(self.room_tier, sqft),
            ServiceType::Deep => sqft.map_or(0.0, |sqft| sqft * 0.23),
            ServiceType::MoveInOut => MOVE_IN_OUT_RATES.price(self.room_tier, sqft),
            ServiceType::WhiteGlove => {
                let base =
                    200.0 + 50.0 * extra_rooms(self.bedrooms) + 50.0 * extra_rooms(self.bathrooms);
                match sqft {
                    Some(sqft) if sqft > 2000.0 => base.max(sqft * 0.20),
                    _ => base,
                }
            }
            ServiceType::AirbnbTurnover => {
                let base =
                    140.0 + 40.0 * extra_rooms(self.bedrooms) + 40.0 * extra_rooms(self.bathrooms);
                match sqft {
                    Some(sqft) if sqft > 1200.0 => base.max(sqft * 0.23),
                    _ => base,
                }
            }
            ServiceType::Custom => 130.0,
        }
    }

    pub fn add_ons_price(&self) -> f64 {
        self.add_ons.len() as f64 * ADD_ON_PRICE
    }

    pub fn estimate(&self) -> PriceBreakdown {
        let base_price = self.base_price();
        let rate = self.recurrence.map_or(0.0, |plan| plan.discount_rate());
        PriceBreakdown::new(base_price, self.add_ons_price(), base_price * rate)
    }
}
