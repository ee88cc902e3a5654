//! Daily money reports. Both are asked for one calendar day and show
//! nothing until a day is picked.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PageId;
use crate::api::{self, lenient, Listing, PageMeta};
use crate::event::RecordId;
use crate::model::Figure;
use crate::resource::{contains_ci, Filter, NoDraft, Operations, Resource, Target};
use crate::AppError;

const DAY: &[Filter] = &[Filter::date("date", "Select Date")];

/// Stakes against payouts for one category on the chosen day.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CategoryProfit {
    pub category_id: RecordId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub category_name: String,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub total_entered_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub total_won_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub profit_loss: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub created_date: String,
}

pub struct ProfitLoss;

impl Resource for ProfitLoss {
    type Record = CategoryProfit;
    type Draft = NoDraft;

    const PAGE: PageId = PageId::ProfitLoss;
    const NOUN: &'static str = "profit/loss row";
    const PLURAL: &'static str = "profit/loss data";
    const OPERATIONS: Operations = Operations::READ_ONLY;
    const POLLS: bool = false;

    fn list() -> Target {
        Target::post("admin/get-all-result")
    }

    fn filters() -> &'static [Filter] {
        DAY
    }

    fn summary(_body: &Value, records: &[CategoryProfit]) -> Option<Figure> {
        (!records.is_empty()).then(|| {
            let net = records.iter().filter_map(|r| r.profit_loss).sum();
            Figure::amount("Net Profit/Loss", net)
        })
    }

    fn id(record: &CategoryProfit) -> RecordId {
        record.category_id
    }

    fn matches(record: &CategoryProfit, needle: &str) -> bool {
        contains_ci(&record.category_name, needle)
    }

    fn draft_from(_record: &CategoryProfit) -> NoDraft {
        NoDraft {}
    }
}

/// Money added against money withdrawn over the chosen day.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DayTotals {
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub total_debit: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub total_credit: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub profit_loss: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub created_date: String,
}

pub struct AddMoneyReport;

impl Resource for AddMoneyReport {
    type Record = DayTotals;
    type Draft = NoDraft;

    const PAGE: PageId = PageId::AddMoneyReport;
    const NOUN: &'static str = "report";
    const PLURAL: &'static str = "profit/loss data";
    const OPERATIONS: Operations = Operations::READ_ONLY;
    const POLLS: bool = false;

    fn list() -> Target {
        Target::post("admin/get-all-add-result")
    }

    fn filters() -> &'static [Filter] {
        DAY
    }

    /// The day's totals come as one object; no object means no row.
    fn decode(body: &Value) -> Result<Listing<DayTotals>, AppError> {
        let items = match body.get("data") {
            Some(data) if data.is_object() => vec![api::decode_record::<DayTotals>(body)?],
            _ => Vec::new(),
        };
        Ok(Listing {
            meta: PageMeta {
                current_page: None,
                total_pages: 1,
                total_count: items.len() as u64,
            },
            items,
        })
    }

    // One row per day.
    fn id(_record: &DayTotals) -> RecordId {
        RecordId(0)
    }

    fn matches(record: &DayTotals, needle: &str) -> bool {
        contains_ci(&record.created_date, needle)
    }

    fn draft_from(_record: &DayTotals) -> NoDraft {
        NoDraft {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profit_rows_sum_to_a_net_figure() {
        let body = json!({"status": "success", "data": [
            {"category_id": 1, "category_name": "Gali", "total_entered_amount": "1000",
             "total_won_amount": "900", "profit_loss": "100", "created_date": "2024-09-01"},
            {"category_id": "2", "category_name": "Desawar", "total_entered_amount": 500,
             "total_won_amount": 700.5, "profit_loss": -200.5, "created_date": "2024-09-01"}
        ]});
        let listing = ProfitLoss::decode(&body).unwrap();
        assert_eq!(listing.items.len(), 2);
        assert_eq!(ProfitLoss::id(&listing.items[1]), RecordId(2));
        assert_eq!(
            ProfitLoss::summary(&body, &listing.items),
            Some(Figure::amount("Net Profit/Loss", -100.5))
        );
        assert_eq!(ProfitLoss::summary(&body, &[]), None);
    }

    #[test]
    fn day_totals_arrive_as_one_object() {
        let body = json!({"status": "success", "data": {
            "total_debit": "1200.00", "total_credit": "3000", "profit_loss": 1800,
            "created_date": "2024-09-01"
        }});
        let listing = AddMoneyReport::decode(&body).unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].total_debit, Some(1200.0));
        assert_eq!(listing.meta.total_count, 1);

        let empty = AddMoneyReport::decode(&json!({"status": "success", "data": null})).unwrap();
        assert!(empty.items.is_empty());
    }

    #[test]
    fn reports_post_the_day_and_do_not_poll() {
        let target = ProfitLoss::list().param("date", "2024-09-01");
        assert_eq!(target.path(), "admin/get-all-result");
        assert_eq!(
            target.payload(),
            &crate::resource::Payload::Json(json!({"date": "2024-09-01"}))
        );
        assert_eq!(AddMoneyReport::filters()[0].name, "date");
        assert!(AddMoneyReport::filters()[0].required);
        assert!(!ProfitLoss::POLLS && !AddMoneyReport::POLLS);
    }
}
