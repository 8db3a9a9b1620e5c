//! Customer feature record: required user-supplied fields plus defaulted optional fields

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Category(String),
}

impl FeatureValue {
    /// Numeric view of the value, `None` for categories
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Int(v) => Some(*v as f64),
            FeatureValue::Float(v) => Some(*v),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FeatureValue::Int(_) => FieldKind::Int,
            FeatureValue::Float(_) => FieldKind::Float,
            FeatureValue::Category(_) => FieldKind::Category,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{}", v),
            FeatureValue::Float(v) => write!(f, "{}", v),
            FeatureValue::Category(v) => f.write_str(v),
        }
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Int(v)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Float(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Category(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Category(v)
    }
}

/// Declared type of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Category,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Int => f.write_str("integer"),
            FieldKind::Float => f.write_str("float"),
            FieldKind::Category => f.write_str("category"),
        }
    }
}

/// Fields the caller must supply, with their declared types
pub const REQUIRED_FIELDS: [(&str, FieldKind); 15] = [
    ("age", FieldKind::Int),
    ("tenure_months", FieldKind::Int),
    ("monthly_logins", FieldKind::Int),
    ("weekly_active_days", FieldKind::Int),
    ("avg_session_time", FieldKind::Float),
    ("monthly_fee", FieldKind::Float),
    ("total_revenue", FieldKind::Float),
    ("payment_failures", FieldKind::Int),
    ("support_tickets", FieldKind::Int),
    ("csat_score", FieldKind::Int),
    ("nps_score", FieldKind::Int),
    ("gender", FieldKind::Category),
    ("contract_type", FieldKind::Category),
    ("payment_method", FieldKind::Category),
    ("complaint_type", FieldKind::Category),
];

/// Optional field with its fixed default
pub struct OptionalField {
    pub name: &'static str,
    pub default: DefaultValue,
}

impl OptionalField {
    const fn int(name: &'static str, default: i64) -> Self {
        Self {
            name,
            default: DefaultValue::Int(default),
        }
    }

    const fn float(name: &'static str, default: f64) -> Self {
        Self {
            name,
            default: DefaultValue::Float(default),
        }
    }

    const fn category(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: DefaultValue::Category(default),
        }
    }
}

/// Const-friendly form of a default value
#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Int(i64),
    Float(f64),
    Category(&'static str),
}

impl DefaultValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            DefaultValue::Int(_) => FieldKind::Int,
            DefaultValue::Float(_) => FieldKind::Float,
            DefaultValue::Category(_) => FieldKind::Category,
        }
    }

    pub fn to_value(&self) -> FeatureValue {
        match self {
            DefaultValue::Int(v) => FeatureValue::Int(*v),
            DefaultValue::Float(v) => FeatureValue::Float(*v),
            DefaultValue::Category(v) => FeatureValue::Category((*v).to_string()),
        }
    }
}

/// Fields filled with a default when the caller omits them
pub const OPTIONAL_FIELDS: [OptionalField; 15] = [
    OptionalField::category("country", "India"),
    OptionalField::category("city", "Unknown"),
    OptionalField::category("customer_segment", "Individual"),
    OptionalField::category("signup_channel", "Web"),
    OptionalField::category("survey_response", "Neutral"),
    OptionalField::category("discount_applied", "No"),
    OptionalField::category("price_increase_last_3m", "No"),
    OptionalField::int("features_used", 5),
    OptionalField::float("usage_growth_rate", 0.0),
    OptionalField::int("last_login_days_ago", 7),
    OptionalField::float("avg_resolution_time", 24.0),
    OptionalField::int("escalations", 0),
    OptionalField::float("email_open_rate", 0.5),
    OptionalField::float("marketing_click_rate", 0.1),
    OptionalField::int("referral_count", 0),
];

/// Declared type of a known field, `None` for fields outside the record schema
pub fn field_kind(name: &str) -> Option<FieldKind> {
    REQUIRED_FIELDS
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, kind)| *kind)
        .or_else(|| {
            OPTIONAL_FIELDS
                .iter()
                .find(|field| field.name == name)
                .map(|field| field.default.kind())
        })
}

/// Validated input attributes for one customer
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeatureRecord {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRecord {
    /// Start a typed builder
    pub fn builder() -> FeatureRecordBuilder {
        FeatureRecordBuilder::default()
    }

    /// Build a record directly from raw values, without required-field checks.
    ///
    /// Used for partial records fed straight into the aligner.
    pub fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, FeatureValue)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Build a record from flat string form fields.
    ///
    /// Known fields are parsed according to their declared type; unknown keys
    /// are kept as categories. Blank values count as absent.
    pub fn from_form<I, K, V>(form: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut builder = Self::builder();
        for (key, raw) in form {
            let key = key.as_ref();
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let value = match field_kind(key) {
                Some(kind) => parse_field(key, raw, kind)?,
                None => FeatureValue::Category(raw.to_string()),
            };
            builder = builder.set(key, value);
        }
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Builder enumerating required and defaulted fields
#[derive(Debug, Default)]
pub struct FeatureRecordBuilder {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRecordBuilder {
    pub fn set(mut self, name: &str, value: impl Into<FeatureValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn int(self, name: &str, value: i64) -> Self {
        self.set(name, FeatureValue::Int(value))
    }

    pub fn float(self, name: &str, value: f64) -> Self {
        self.set(name, FeatureValue::Float(value))
    }

    pub fn category(self, name: &str, value: &str) -> Self {
        self.set(name, FeatureValue::Category(value.to_string()))
    }

    /// Validate required fields, type-check known fields and fill defaults
    pub fn build(self) -> Result<FeatureRecord> {
        let mut values = self.values;

        for (name, kind) in REQUIRED_FIELDS.iter() {
            let value = values
                .remove(*name)
                .ok_or_else(|| ChurnError::validation(*name, "missing required field"))?;
            values.insert((*name).to_string(), check_kind(name, value, *kind)?);
        }

        for field in OPTIONAL_FIELDS.iter() {
            let value = match values.remove(field.name) {
                Some(value) => check_kind(field.name, value, field.default.kind())?,
                None => field.default.to_value(),
            };
            values.insert(field.name.to_string(), value);
        }

        Ok(FeatureRecord { values })
    }
}

fn check_kind(name: &str, value: FeatureValue, kind: FieldKind) -> Result<FeatureValue> {
    match (kind, value) {
        (FieldKind::Int, FeatureValue::Int(v)) => Ok(FeatureValue::Int(v)),
        (FieldKind::Float, FeatureValue::Float(v)) if v.is_finite() => Ok(FeatureValue::Float(v)),
        // integers widen to floats, as form input "12" is a valid session time
        (FieldKind::Float, FeatureValue::Int(v)) => Ok(FeatureValue::Float(v as f64)),
        (FieldKind::Category, FeatureValue::Category(v)) if !v.trim().is_empty() => {
            Ok(FeatureValue::Category(v))
        }
        (kind, value) => Err(ChurnError::validation(
            name,
            format!("expected {}, got {} `{}`", kind, value.kind(), value),
        )),
    }
}

fn parse_field(name: &str, raw: &str, kind: FieldKind) -> Result<FeatureValue> {
    match kind {
        FieldKind::Int => raw
            .parse::<i64>()
            .map(FeatureValue::Int)
            .map_err(|_| ChurnError::validation(name, format!("expected integer, got `{}`", raw))),
        FieldKind::Float => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(FeatureValue::Float(v)),
            _ => Err(ChurnError::validation(
                name,
                format!("expected float, got `{}`", raw),
            )),
        },
        FieldKind::Category => Ok(FeatureValue::Category(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample_form() -> Vec<(&'static str, &'static str)> {
        vec![
            ("age", "32"),
            ("tenure_months", "24"),
            ("monthly_logins", "40"),
            ("weekly_active_days", "5"),
            ("avg_session_time", "12.5"),
            ("monthly_fee", "49.99"),
            ("total_revenue", "1200.0"),
            ("payment_failures", "0"),
            ("support_tickets", "1"),
            ("csat_score", "8"),
            ("nps_score", "9"),
            ("gender", "Male"),
            ("contract_type", "Yearly"),
            ("payment_method", "Card"),
            ("complaint_type", "None"),
        ]
    }

    #[test]
    fn test_form_fills_defaults() {
        let record = FeatureRecord::from_form(sample_form()).unwrap();

        assert_eq!(record.len(), 30);
        assert_eq!(record.get("age"), Some(&FeatureValue::Int(32)));
        assert_eq!(record.get("monthly_fee"), Some(&FeatureValue::Float(49.99)));
        assert_eq!(record.get("country"), Some(&FeatureValue::from("India")));
        assert_eq!(record.get("features_used"), Some(&FeatureValue::Int(5)));
        assert_eq!(record.get("avg_resolution_time"), Some(&FeatureValue::Float(24.0)));
    }

    #[test]
    fn test_non_numeric_support_tickets_rejected() {
        let mut form = sample_form();
        form.retain(|(k, _)| *k != "support_tickets");
        form.push(("support_tickets", "abc"));

        let err = FeatureRecord::from_form(form).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        match err {
            ChurnError::Validation { field, .. } => assert_eq!(field, "support_tickets"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let form: Vec<_> = sample_form().into_iter().filter(|(k, _)| *k != "gender").collect();
        let err = FeatureRecord::from_form(form).unwrap_err();
        assert!(err.to_string().contains("`gender`"));
    }

    #[test]
    fn test_blank_required_value_counts_as_missing() {
        let mut form = sample_form();
        form.retain(|(k, _)| *k != "age");
        form.push(("age", "  "));
        assert!(FeatureRecord::from_form(form).is_err());
    }

    #[test]
    fn test_integer_field_rejects_fraction() {
        let mut form = sample_form();
        form.retain(|(k, _)| *k != "age");
        form.push(("age", "32.5"));
        assert!(FeatureRecord::from_form(form).is_err());
    }

    #[test]
    fn test_optional_override_and_extra_key() {
        let mut form = sample_form();
        form.push(("country", "UK"));
        form.push(("referral_count", "3"));
        form.push(("customer_id", "CUST-1001"));

        let record = FeatureRecord::from_form(form).unwrap();
        assert_eq!(record.get("country"), Some(&FeatureValue::from("UK")));
        assert_eq!(record.get("referral_count"), Some(&FeatureValue::Int(3)));
        assert_eq!(record.get("customer_id"), Some(&FeatureValue::from("CUST-1001")));
    }

    #[test]
    fn test_builder_type_mismatch() {
        let err = FeatureRecord::builder()
            .category("age", "thirty")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_builder_widens_int_to_float() {
        let mut builder = FeatureRecord::builder();
        for (name, raw) in sample_form() {
            builder = builder.set(name, parse_field(name, raw, field_kind(name).unwrap()).unwrap());
        }
        let record = builder.int("avg_session_time", 12).build().unwrap();
        assert_eq!(record.get("avg_session_time"), Some(&FeatureValue::Float(12.0)));
    }
}
