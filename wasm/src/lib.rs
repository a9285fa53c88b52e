//! WebAssembly module for the packhouse platform
//!
//! Provides client-side previews for:
//! - Net weight of a weighing set
//! - FIFO allocation of a supply consumption
//! - Order totals and payment headroom
//! - Pallet totals
//!
//! Decimals cross the boundary as strings so no precision is lost to `f64`.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

use shared::fifo::{FifoLedger, LedgerEntry};
use shared::folio::SequenceScope;
use shared::{OrderTotals, PalletTotals, PaymentStatus, WeighingReading};

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::validation::*;

/// Rejections surface in JavaScript as `Error` objects
fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&format!("{}: {}", context, err)).into()
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, JsValue> {
    Decimal::from_str(value.trim()).map_err(|e| js_error(field, e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| js_error("serialize", e))
}

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("packhouse-wasm loaded"));
}

/// Net weight of a weighing set given as JSON; returns the kg as a decimal string
#[wasm_bindgen]
pub fn calculate_net_weight(reading_json: &str) -> Result<String, JsValue> {
    let reading: WeighingReading =
        serde_json::from_str(reading_json).map_err(|e| js_error("Invalid weighing JSON", e))?;
    let net = reading
        .net_weight_kg()
        .map_err(|e| js_error("Invalid weighing", e))?;
    Ok(net.to_string())
}

/// Lots a consumption of `quantity` would draw from, as a JSON array of allocations
#[wasm_bindgen]
pub fn preview_fifo_allocation(entries_json: &str, quantity: &str) -> Result<String, JsValue> {
    let entries: Vec<LedgerEntry> =
        serde_json::from_str(entries_json).map_err(|e| js_error("Invalid ledger JSON", e))?;
    let quantity = parse_decimal("quantity", quantity)?;

    let ledger = FifoLedger::replay(&entries).map_err(|e| js_error("Invalid ledger", e))?;
    let allocations = ledger
        .allocate(quantity)
        .map_err(|e| js_error("Cannot allocate", e))?;
    to_json(&allocations)
}

#[derive(Deserialize)]
struct PaymentInput {
    amount: Decimal,
    status: PaymentStatus,
}

#[derive(Deserialize)]
struct OrderInput {
    #[serde(default)]
    lines: Vec<Decimal>,
    #[serde(default)]
    charges: Vec<Decimal>,
    #[serde(default)]
    deductions: Vec<Decimal>,
    #[serde(default)]
    payments: Vec<PaymentInput>,
}

/// Order totals from `{lines, charges, deductions, payments}` JSON
#[wasm_bindgen]
pub fn calculate_order_totals(order_json: &str) -> Result<String, JsValue> {
    let input: OrderInput =
        serde_json::from_str(order_json).map_err(|e| js_error("Invalid order JSON", e))?;
    let payments: Vec<(Decimal, PaymentStatus)> =
        input.payments.iter().map(|p| (p.amount, p.status)).collect();

    let totals = OrderTotals::compute(&input.lines, &input.charges, &input.deductions, &payments)
        .map_err(|e| js_error("Invalid order", e))?;
    to_json(&totals)
}

/// Whether a payment of `amount` fits the order; the error text explains why not
#[wasm_bindgen]
pub fn check_payment(order_json: &str, amount: &str) -> Result<bool, JsValue> {
    let totals: OrderTotals =
        serde_json::from_str(&calculate_order_totals(order_json)?).map_err(|e| js_error("totals", e))?;
    let amount = parse_decimal("amount", amount)?;
    totals
        .ensure_payment_fits(amount)
        .map(|_| true)
        .map_err(|e| js_error("Payment rejected", e))
}

/// Pallet totals from a JSON array of `[package_count, weight_per_package_kg]`
#[wasm_bindgen]
pub fn calculate_pallet_totals(packages_json: &str) -> Result<String, JsValue> {
    let packages: Vec<(i32, Decimal)> =
        serde_json::from_str(packages_json).map_err(|e| js_error("Invalid packages JSON", e))?;
    to_json(&PalletTotals::from_packages(&packages))
}

/// Render a folio from a scope name such as `"batch"` and an ooid
#[wasm_bindgen]
pub fn format_folio(scope: &str, ooid: i64) -> Result<String, JsValue> {
    let scope: SequenceScope = serde_json::from_value(serde_json::Value::String(scope.to_string()))
        .map_err(|e| js_error("Unknown scope", e))?;
    Ok(scope.folio(ooid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_weight() {
        let json = r#"{"gross_weight_kg":"1040","platform_tare_kg":"40","container_count":50,"container_tare_kg":"1.2"}"#;
        assert_eq!(calculate_net_weight(json).unwrap(), "940.0");
    }

    #[test]
    fn test_order_totals() {
        let json = r#"{"lines":["1000"],"charges":["100"],"payments":[{"amount":"300","status":"applied"},{"amount":"50","status":"canceled"}]}"#;
        let totals: OrderTotals = serde_json::from_str(&calculate_order_totals(json).unwrap()).unwrap();
        assert_eq!(totals.total, Decimal::from(1100));
        assert_eq!(totals.balance, Decimal::from(800));
        assert!(check_payment(json, "800").unwrap());
    }

    #[test]
    fn test_pallet_totals() {
        let totals: PalletTotals =
            serde_json::from_str(&calculate_pallet_totals(r#"[[10,"4.5"],[2,"9"]]"#).unwrap()).unwrap();
        assert_eq!(totals.package_count, 12);
        assert_eq!(totals.net_weight_kg, Decimal::from(63));
    }

    #[test]
    fn test_format_folio() {
        assert_eq!(format_folio("batch", 7).unwrap(), "BAT-000007");
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    fn message(err: JsValue) -> String {
        String::from(js_sys::Error::from(err).message())
    }

    #[wasm_bindgen_test]
    fn test_tare_above_gross_rejected() {
        let json = r#"{"gross_weight_kg":"100","platform_tare_kg":"40","container_count":50,"container_tare_kg":"1.2"}"#;
        let err = calculate_net_weight(json).unwrap_err();
        assert!(message(err).starts_with("Invalid weighing"));
    }

    #[wasm_bindgen_test]
    fn test_fifo_preview_draws_oldest_first() {
        let entries = r#"[
            {"id":"00000000-0000-0000-0000-000000000002","direction":"in","quantity":"5","unit_cost":"3",
             "occurred_at":"2024-05-01T06:00:00Z","seq":2,"consumed_from":null},
            {"id":"00000000-0000-0000-0000-000000000001","direction":"in","quantity":"10","unit_cost":"2",
             "occurred_at":"2024-05-01T07:00:00Z","seq":1,"consumed_from":null}
        ]"#;
        let plan = preview_fifo_allocation(entries, "12").unwrap();
        let allocations: Vec<shared::fifo::Allocation> = serde_json::from_str(&plan).unwrap();
        assert_eq!(allocations[0].lot_id.to_string(), "00000000-0000-0000-0000-000000000001");
        assert_eq!(allocations[0].quantity, Decimal::from(10));
        assert_eq!(allocations[1].quantity, Decimal::from(2));

        let err = preview_fifo_allocation(entries, "16").unwrap_err();
        assert!(message(err).starts_with("Cannot allocate"));
    }

    #[wasm_bindgen_test]
    fn test_overpayment_rejected() {
        let json = r#"{"lines":["100"],"payments":[{"amount":"60","status":"applied"}]}"#;
        assert!(check_payment(json, "40").unwrap());
        let err = check_payment(json, "40.01").unwrap_err();
        assert!(message(err).starts_with("Payment rejected"));
    }

    #[wasm_bindgen_test]
    fn test_unknown_scope_rejected() {
        assert!(format_folio("invoice", 1).is_err());
    }
}
