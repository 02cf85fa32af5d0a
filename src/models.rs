// Wire types for the back office API
// Required fields are required: a payload missing one fails to decode instead of turning into a silent default

use serde::{Deserialize, Deserializer, Serialize};

// Standard `{ success, message?, data }` envelope
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

// Write responses where only the outcome matters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// Account numbers arrive both as JSON numbers and as strings
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Int(number) => number.to_string(),
        Raw::Float(number) => number.to_string(),
    }))
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub booking_reference: Option<String>,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub services: String,
    pub service_type: Option<String>,
    pub charge: f64,
    pub status: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub reoccurrence: Option<String>,
    #[serde(default)]
    pub selected_addons: Vec<String>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub year_of_experience: String,
    pub preferred_service: String,
    pub preferred_work_area: String,
    pub availability: String,
    pub short_bio: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cleaner {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub status: Option<String>,
    pub wallet: Option<f64>,
    pub work_experience: Option<WorkExperience>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub role: Option<String>,
    pub is_blocked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bank {
    #[serde(rename = "_id")]
    pub id: String,
    pub bank_name: String,
    pub account_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Faq {
    #[serde(rename = "_id")]
    pub id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewFaq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub service_name: String,
    pub description: String,
    #[serde(default)]
    pub service_type: Vec<String>,
    #[serde(default)]
    pub prices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCatalogEntry {
    pub service_name: String,
    pub description: String,
    pub service_type: Vec<String>,
    pub prices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AboutContent {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewAbout {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdmin {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub address: String,
    pub gender: String,
    pub date_of_birth: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCleaner {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub address: String,
    pub province: String,
    pub zip_code: String,
    pub gender: String,
    pub date_of_birth: String,
    pub work_experience: WorkExperience,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoginData {
    pub token: String,
    pub user: AdminUser,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAssignRequest {
    pub booking_id: String,
    pub worker_ids: Vec<String>,
}

// Payout rows joined from worker, assignment and bank collections
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisbursementRecord {
    pub worker_info: WorkerInfo,
    pub cleaner_info: CleanerAssignment,
    pub bank_details: Option<BankDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerInfo {
    pub full_name: String,
    pub phone_number: Option<String>,
    pub wallet: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanerAssignment {
    pub status: String,
    #[serde(rename = "bookingId")]
    pub booking: BookingSummary,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub services: String,
    pub service_type: Option<String>,
    pub booking_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub bank_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingTotals {
    pub total_bookings: u64,
    pub percentage_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotals {
    pub total_revenue: f64,
    pub percentage_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotals {
    pub total_users: u64,
    pub percentage_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerTotals {
    pub total_workers: u64,
    pub percentage_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DayOfMonth {
    pub month: u32,
    pub day: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCompleted {
    #[serde(rename = "_id")]
    pub period: DayOfMonth,
    pub total_completed: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningSummary {
    pub total_this_week: u64,
    pub weekly_growth: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningServiceGraph {
    #[serde(default)]
    pub this_week: Vec<DailyCompleted>,
    #[serde(default)]
    pub last_week: Vec<DailyCompleted>,
    pub summary: Option<CleaningSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonthKey {
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WeekKey {
    pub week: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    #[serde(rename = "_id")]
    pub period: MonthKey,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRevenue {
    #[serde(rename = "_id")]
    pub period: WeekKey,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueGraph {
    #[serde(default)]
    pub monthly_revenue: Vec<MonthlyRevenue>,
    #[serde(default)]
    pub weekly_revenue: Vec<WeeklyRevenue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_booking_requires_identity_fields() {
        let complete = json!({
            "_id": "b1",
            "fullName": "Jane Doe",
            "email": "jane@example.com",
            "services": "deep-cleaning",
            "charge": 230.0
        });
        let booking: Booking = serde_json::from_value(complete).unwrap();
        assert_eq!(booking.id, "b1");
        assert!(booking.selected_addons.is_empty());
        assert_eq!(booking.status, None);

        let missing_charge = json!({
            "_id": "b1",
            "fullName": "Jane Doe",
            "email": "jane@example.com",
            "services": "deep-cleaning"
        });
        let error = serde_json::from_value::<Booking>(missing_charge).unwrap_err();
        assert!(error.to_string().contains("charge"));
    }

    #[test]
    fn test_account_number_accepts_numbers_and_text() {
        let bank: Bank = serde_json::from_value(json!({
            "_id": "k1",
            "bankName": "First Bank",
            "accountNumber": 1234567890u64
        }))
        .unwrap();
        assert_eq!(bank.account_number.as_deref(), Some("1234567890"));

        let bank: Bank = serde_json::from_value(json!({
            "_id": "k2",
            "bankName": "First Bank",
            "accountNumber": "0042"
        }))
        .unwrap();
        assert_eq!(bank.account_number.as_deref(), Some("0042"));

        let bank: Bank =
            serde_json::from_value(json!({ "_id": "k3", "bankName": "First Bank" })).unwrap();
        assert_eq!(bank.account_number, None);
    }

    #[test]
    fn test_disbursement_record_shape() {
        let record: DisbursementRecord = serde_json::from_value(json!({
            "workerInfo": { "fullName": "Sam Sweep", "phoneNumber": "555-0101", "wallet": 120.5 },
            "cleanerInfo": {
                "status": "completed",
                "bookingId": {
                    "services": "move-in-out",
                    "serviceType": "studio",
                    "bookingReference": "REF-7"
                }
            },
            "bankDetails": null
        }))
        .unwrap();

        assert_eq!(record.cleaner_info.booking.booking_reference.as_deref(), Some("REF-7"));
        assert!(record.bank_details.is_none());
    }

    #[test]
    fn test_graph_collections_default_to_empty() {
        let graph: RevenueGraph = serde_json::from_value(json!({})).unwrap();
        assert!(graph.monthly_revenue.is_empty());

        let graph: CleaningServiceGraph = serde_json::from_value(json!({
            "thisWeek": [{ "_id": { "month": 6, "day": 3 }, "totalCompleted": 4 }]
        }))
        .unwrap();
        assert_eq!(graph.this_week[0].period.day, 3);
        assert!(graph.last_week.is_empty());
    }
}
