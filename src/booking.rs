// Staff-entered booking draft and the create payload sent to the back office

use crate::pricing::{BookingConfiguration, PriceBreakdown, RecurrencePlan, RoomTier, ServiceType};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

pub const BOOKING_DURATION: &str = "Approx. 3 hours";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("The estimated total is zero; check the service and home size")]
    ZeroCharge,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub street_number: String,
    pub city: String,
    pub zip_code: String,
    pub state: String,
    pub county: String,
    pub pets: String,
    pub last_cleaning: String,
    pub date: Option<NaiveDate>,
    pub time: String,
    pub special_requests: String,
    pub configuration: BookingConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingPayload {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub services: Option<ServiceType>,
    pub service_type: Option<RoomTier>,
    pub square_footage: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub last_cleaning: String,
    pub address: String,
    pub street_number: String,
    pub city: String,
    pub zip_code: String,
    pub province: String,
    pub county: String,
    pub pets: String,
    pub reoccurrence: Option<RecurrencePlan>,
    pub date: Option<String>,
    pub time: String,
    pub selected_addons: Vec<String>,
    pub special_requests: String,
    pub charge: f64,
    pub duration: String,
    pub cleaners: String,
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl BookingDraft {
    pub fn new(configuration: BookingConfiguration) -> Self {
        Self {
            configuration,
            ..Default::default()
        }
    }

    // Every required field still empty, in form order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let config = &self.configuration;
        let checks: [(&'static str, bool); 19] = [
            ("serviceType", config.service_type().is_none()),
            ("squareFootage", config.square_footage().is_none()),
            ("bedrooms", config.bedrooms().is_none()),
            ("bathrooms", config.bathrooms().is_none()),
            ("lastCleaning", blank(&self.last_cleaning)),
            ("address", blank(&self.address)),
            ("city", blank(&self.city)),
            ("zipCode", blank(&self.zip_code)),
            ("state", blank(&self.state)),
            ("county", blank(&self.county)),
            ("pets", blank(&self.pets)),
            ("streetNumber", blank(&self.street_number)),
            ("firstName", blank(&self.first_name)),
            ("lastName", blank(&self.last_name)),
            ("email", blank(&self.email)),
            ("phone", blank(&self.phone)),
            ("reoccurrence", config.recurrence().is_none()),
            ("date", self.date.is_none()),
            ("time", blank(&self.time)),
        ];

        checks
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn validate(&self) -> Result<PriceBreakdown, BookingValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(BookingValidationError::MissingFields(missing));
        }

        let estimate = self.configuration.estimate();
        if estimate.total_price() <= 0.0 {
            return Err(BookingValidationError::ZeroCharge);
        }
        Ok(estimate)
    }

    pub fn to_payload(&self) -> CreateBookingPayload {
        let config = &self.configuration;
        let estimate = config.estimate();

        CreateBookingPayload {
            full_name: format!("{} {}", self.first_name.trim(), self.last_name.trim()),
            email: self.email.trim().to_string(),
            phone_number: self.phone.trim().to_string(),
            services: config.service_type(),
            service_type: config.room_tier(),
            square_footage: config.square_footage(),
            bedrooms: config.bedrooms(),
            bathrooms: config.bathrooms(),
            last_cleaning: self.last_cleaning.clone(),
            address: self.address.clone(),
            street_number: self.street_number.clone(),
            city: self.city.clone(),
            zip_code: self.zip_code.clone(),
            province: self.state.clone(),
            county: self.county.clone(),
            pets: self.pets.clone(),
            reoccurrence: config.recurrence(),
            date: self.date.map(|date| date.format("%Y-%m-%d").to_string()),
            time: self.time.clone(),
            selected_addons: config.add_ons().to_vec(),
            special_requests: self.special_requests.clone(),
            charge: estimate.total_price(),
            duration: BOOKING_DURATION.to_string(),
            cleaners: config
                .bedrooms()
                .map(|beds| beds.to_string())
                .unwrap_or_else(|| "1".to_string()),
        }
    }
}
