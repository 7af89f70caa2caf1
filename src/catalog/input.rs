//! Request-body validation for product writes. Numeric fields accept either a
//! JSON number or a numeric string, since browser forms post both.

use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::storage::{NewProduct, ProductPatch, DEFAULT_CATEGORY};

fn invalid(field: &str, why: &str) -> AppError {
    AppError::validation("invalid_field".to_string(), format!("{}: {}", field, why))
}

fn as_object(body: &Value) -> AppResult<&Map<String, Value>> {
    body.as_object().ok_or_else(|| AppError::validation("invalid_body", "request body must be a JSON object"))
}

fn string_field(field: &str, v: &Value) -> AppResult<String> {
    v.as_str().map(str::to_string).ok_or_else(|| invalid(field, "must be a string"))
}

fn name_field(v: &Value) -> AppResult<String> {
    let name = string_field("name", v)?;
    if name.is_empty() { return Err(invalid("name", "must not be empty")); }
    Ok(name)
}

fn price_field(v: &Value) -> AppResult<f64> {
    let price = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid("price", "must be a number"))?;
    if !price.is_finite() || price < 0.0 {
        return Err(invalid("price", "must be a non-negative number"));
    }
    Ok(price)
}

fn stock_field(v: &Value) -> AppResult<u64> {
    let negative = || invalid("stock", "must not be negative");
    match v {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() { return Ok(u); }
            if n.as_i64().is_some() { return Err(negative()); }
            match n.as_f64() {
                // Integral floats such as 80.0; 2^64 and beyond do not fit.
                Some(f) if f.fract() == 0.0 && f >= 0.0 && f < 18_446_744_073_709_551_616.0 => Ok(f as u64),
                Some(f) if f.fract() == 0.0 && f < 0.0 => Err(negative()),
                _ => Err(invalid("stock", "must be an integer")),
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(u) = s.parse::<u64>() { return Ok(u); }
            match s.parse::<i128>() {
                Ok(i) if i < 0 => Err(negative()),
                _ => Err(invalid("stock", "must be an integer")),
            }
        }
        _ => Err(invalid("stock", "must be an integer")),
    }
}

/// Optional text field: absent or null means "not given".
fn optional_text(obj: &Map<String, Value>, field: &str) -> AppResult<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => string_field(field, v).map(Some),
    }
}

pub fn parse_new_product(body: &Value) -> AppResult<NewProduct> {
    let obj = as_object(body)?;
    for field in ["name", "price", "stock"] {
        if !obj.contains_key(field) {
            return Err(AppError::validation("missing_field".to_string(), format!("required field: {}", field)));
        }
    }
    Ok(NewProduct {
        name: name_field(&obj["name"])?,
        description: optional_text(obj, "description")?.unwrap_or_default(),
        price: price_field(&obj["price"])?,
        stock: stock_field(&obj["stock"])?,
        category: optional_text(obj, "category")?.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    })
}

/// Keys outside the product's updatable fields are ignored.
pub fn parse_patch(body: &Value) -> AppResult<ProductPatch> {
    let obj = as_object(body)?;
    Ok(ProductPatch {
        name: obj.get("name").map(name_field).transpose()?,
        description: optional_text(obj, "description")?,
        price: obj.get("price").map(price_field).transpose()?,
        stock: obj.get("stock").map(stock_field).transpose()?,
        category: optional_text(obj, "category")?,
    })
}
