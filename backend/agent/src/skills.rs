//! Demo skills: a fixed-rate currency converter and an inventory counter.

use once_cell::sync::Lazy;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use serde_json::Value;

use parley_core::Skill;

/// Rate applied by [`ConvertCurrency`] to every pair.
pub const DEMO_RATE: f64 = 1.1;

static CONVERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*([a-z]{3})\s+(?:to|in|into)\s+([a-z]{3})\b").unwrap()
});
static PRODUCT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:product type|how many|count(?: inventory for)?|stock of)\s+([a-z][a-z0-9_-]*)")
        .unwrap()
});

fn text_arg(args: &Value) -> &str {
    args.get("text").and_then(Value::as_str).unwrap_or_default()
}

/// Converts an amount between currencies at [`DEMO_RATE`].
///
/// Accepts `{"amount", "from", "to"}` or free text such as
/// `"Convert 100 USD to EUR"` under `"text"`.
pub struct ConvertCurrency;

impl ConvertCurrency {
    fn parse(args: &Value) -> Result<(f64, String, String)> {
        if let (Some(amount), Some(from), Some(to)) = (
            args.get("amount").and_then(Value::as_f64),
            args.get("from").and_then(Value::as_str),
            args.get("to").and_then(Value::as_str),
        ) {
            return Ok((amount, from.to_uppercase(), to.to_uppercase()));
        }
        let text = text_arg(args);
        let caps = CONVERSION_RE
            .captures(text)
            .ok_or_else(|| anyhow!("could not find an amount and currency pair in '{text}'"))?;
        let amount: f64 = caps[1].parse()?;
        Ok((amount, caps[2].to_uppercase(), caps[3].to_uppercase()))
    }
}

#[async_trait]
impl Skill for ConvertCurrency {
    fn name(&self) -> &str {
        "convert_currency"
    }

    fn description(&self) -> &str {
        "Converts an amount between two currencies at a fixed demo rate."
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        let (amount, from, to) = Self::parse(&args)?;
        Ok(format!(
            "{amount} {from} = {:.2} {to} (demo rate)",
            amount * DEMO_RATE
        ))
    }
}

/// Reports a made-up stock count for a product type.
pub struct CountProducts;

impl CountProducts {
    fn product(args: &Value) -> String {
        if let Some(product) = args.get("product_type").and_then(Value::as_str) {
            return product.to_string();
        }
        PRODUCT_RE
            .captures(text_arg(args))
            .map(|caps| caps[1].to_lowercase())
            .unwrap_or_else(|| "items".to_string())
    }
}

#[async_trait]
impl Skill for CountProducts {
    fn name(&self) -> &str {
        "count_products"
    }

    fn description(&self) -> &str {
        "Returns the number of items in stock for a product type."
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        let product = Self::product(&args);
        let count = rand::thread_rng().gen_range(1..=500);
        Ok(format!("We currently have {count} items of {product}."))
    }
}
