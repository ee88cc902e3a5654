//! Stake totals per played number for one category, the jantri sheet.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PageId;
use crate::api::{self, lenient, Listing};
use crate::event::RecordId;
use crate::model::Figure;
use crate::resource::{Filter, NoDraft, Operations, Paging, Resource, Target};
use crate::AppError;

/// Every two-digit number fits on one sheet.
const SHEET: u32 = 100;

pub const HARUP_SIDES: &[&str] = &["bahar_harup", "ander_harup"];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NumberTotal {
    #[serde(deserialize_with = "lenient::text")]
    pub number: String,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub total: Option<f64>,
}

fn number_id(record: &NumberTotal) -> RecordId {
    RecordId(record.number.trim().parse().unwrap_or_default())
}

fn total_of(records: &[NumberTotal]) -> f64 {
    records.iter().filter_map(|r| r.total).sum()
}

pub struct Jantri;

impl Resource for Jantri {
    type Record = NumberTotal;
    type Draft = NoDraft;

    const PAGE: PageId = PageId::Jantri;
    const NOUN: &'static str = "number";
    const PLURAL: &'static str = "game numbers";
    const OPERATIONS: Operations = Operations::READ_ONLY;
    const POLLS: bool = false;

    fn list() -> Target {
        Target::get("admin/play-games-numbers")
    }

    fn paging(_page_size: u32) -> Paging {
        Paging::Client { per_page: SHEET }
    }

    fn filters() -> &'static [Filter] {
        const FILTERS: &[Filter] = &[Filter::category("category_id", "Category")];
        FILTERS
    }

    fn decode(body: &Value) -> Result<Listing<NumberTotal>, AppError> {
        api::decode_array(body.pointer("/data/all_results"))
    }

    fn summary(_body: &Value, records: &[NumberTotal]) -> Option<Figure> {
        Some(Figure::amount("Total Amount for Category", total_of(records)))
    }

    fn id(record: &NumberTotal) -> RecordId {
        number_id(record)
    }

    fn matches(record: &NumberTotal, needle: &str) -> bool {
        record.number.starts_with(needle)
    }

    fn draft_from(_record: &NumberTotal) -> NoDraft {
        NoDraft {}
    }
}

/// Single-digit stakes on the outside (bahar) or inside (ander) digit.
pub struct HarupJantri;

impl Resource for HarupJantri {
    type Record = NumberTotal;
    type Draft = NoDraft;

    const PAGE: PageId = PageId::HarupJantri;
    const NOUN: &'static str = "number";
    const PLURAL: &'static str = "game numbers";
    const OPERATIONS: Operations = Operations::READ_ONLY;
    const POLLS: bool = false;

    fn list() -> Target {
        Target::get("admin/play-games-number-harup")
    }

    fn paging(_page_size: u32) -> Paging {
        Paging::Client { per_page: SHEET }
    }

    fn filters() -> &'static [Filter] {
        const FILTERS: &[Filter] = &[
            Filter::category("category_id", "Category"),
            Filter::choice("game_type", "Game Type", HARUP_SIDES, "").required(),
        ];
        FILTERS
    }

    fn decode(body: &Value) -> Result<Listing<NumberTotal>, AppError> {
        api::decode_array(body.get("bettingTotals"))
    }

    /// The server's own total when it sends one.
    fn summary(body: &Value, records: &[NumberTotal]) -> Option<Figure> {
        let total = body
            .get("totalAmount")
            .and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or_else(|| total_of(records));
        Some(Figure::amount("Total Amount", total))
    }

    fn id(record: &NumberTotal) -> RecordId {
        number_id(record)
    }

    fn matches(record: &NumberTotal, needle: &str) -> bool {
        record.number.starts_with(needle)
    }

    fn draft_from(_record: &NumberTotal) -> NoDraft {
        NoDraft {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn jantri_totals_sum_to_two_decimals() {
        let body = json!({"status": "success", "data": {"all_results": [
            {"number": "00", "total": "120.5"},
            {"number": "07", "total": 30},
            {"number": 45, "total": null}
        ]}});
        let listing = Jantri::decode(&body).unwrap();
        assert_eq!(listing.items.len(), 3);
        assert_eq!(listing.items[2].number, "45");
        assert_eq!(Jantri::id(&listing.items[1]), RecordId(7));
        let figure = Jantri::summary(&body, &listing.items).unwrap();
        assert_eq!(figure.value, "150.50");
        assert!(Jantri::decode(&json!({"data": []})).is_err());
    }

    #[test]
    fn harup_prefers_the_server_total() {
        let body = json!({
            "bettingTotals": [{"number": "3", "total": "20"}, {"number": "8", "total": "5"}],
            "totalAmount": "40"
        });
        let listing = HarupJantri::decode(&body).unwrap();
        assert_eq!(listing.items.len(), 2);
        assert_eq!(HarupJantri::summary(&body, &listing.items).unwrap().value, "40.00");

        let body = json!({"bettingTotals": [{"number": "3", "total": "20"}]});
        let listing = HarupJantri::decode(&body).unwrap();
        assert_eq!(HarupJantri::summary(&body, &listing.items).unwrap().value, "20.00");
    }

    #[test]
    fn harup_needs_category_and_side() {
        let filters = HarupJantri::filters();
        assert!(filters.iter().all(|f| f.required));
        assert!(filters[1].accepts("ander_harup"));
        assert!(!filters[1].accepts("jodi"));
    }
}
