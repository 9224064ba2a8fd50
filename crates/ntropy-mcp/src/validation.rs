// crates/ntropy-mcp/src/validation.rs
// ============================================================================
// Module: Request Validation
// Description: Argument checking, defaulting, and coercion for tool calls.
// Purpose: Turn untrusted tool arguments into typed remote requests.
// Dependencies: ntropy-mcp-contract, ntropy-mcp-core, time
// ============================================================================

//! ## Overview
//! Validation is driven entirely by the tool's [`ToolContract`]: every
//! declared parameter is checked against its semantic [`ParamType`], optional
//! parameters receive their declared defaults, and undeclared arguments are
//! ignored. Identifiers arrive as strings or integers and leave as one
//! canonical [`Identifier`]. Validation is a pure function and fails closed on
//! the first offending field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use ntropy_mcp_contract::ParamSpec;
use ntropy_mcp_contract::ParamType;
use ntropy_mcp_contract::ToolContract;
use ntropy_mcp_contract::tooling::transaction_params;
use ntropy_mcp_core::AccountHolderType;
use ntropy_mcp_core::EntryType;
use ntropy_mcp_core::Identifier;
use ntropy_mcp_core::ListQuery;
use ntropy_mcp_core::NewAccountHolder;
use ntropy_mcp_core::ToolName;
use ntropy_mcp_core::TransactionInput;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Pseudo-field named when the argument payload itself has the wrong type.
const ARGUMENTS_FIELD: &str = "arguments";
/// Calendar date layout accepted for transaction dates.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
/// Nested object on bulk items that may carry the country code.
const LOCATION_KEY: &str = "location";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Caller-input failures detected before any remote call.
///
/// # Invariants
/// - Variants are stable for error classification.
/// - Every variant except `UnknownTool` names the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Tool name not in the catalogue.
    #[error("unknown tool: {tool}")]
    UnknownTool {
        /// Name supplied by the caller.
        tool: String,
    },
    /// Required parameter absent or null.
    #[error("missing required parameter: {field}")]
    MissingParameter {
        /// Offending field path.
        field: String,
    },
    /// Parameter present but not coercible to its declared type.
    #[error("parameter {field} must be a {expected}")]
    TypeMismatch {
        /// Offending field path.
        field: String,
        /// Expected semantic type label.
        expected: &'static str,
    },
}

impl ValidationError {
    /// Returns the stable kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool { .. } => "unknown_tool",
            Self::MissingParameter { .. } => "missing_parameter",
            Self::TypeMismatch { .. } => "type_mismatch",
        }
    }

    /// Returns the offending field path, when one applies.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownTool { .. } => None,
            Self::MissingParameter { field } | Self::TypeMismatch { field, .. } => Some(field),
        }
    }

    /// Builds a type mismatch for `field`.
    fn mismatch(field: &str, param_type: ParamType) -> Self {
        Self::TypeMismatch { field: field.to_string(), expected: param_type.label() }
    }
}

// ============================================================================
// SECTION: Validated Values
// ============================================================================

/// A validated tool call, typed per tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    /// `create_account_holder`.
    CreateAccountHolder(NewAccountHolder),
    /// `enrich_transaction`.
    EnrichTransaction(TransactionInput),
    /// `get_account_holder`.
    GetAccountHolder(Identifier),
    /// `list_transactions`.
    ListTransactions(ListQuery),
    /// `get_transaction`.
    GetTransaction(Identifier),
    /// `bulk_enrich_transactions`.
    BulkEnrichTransactions(Vec<TransactionInput>),
    /// `delete_account_holder`.
    DeleteAccountHolder(Identifier),
    /// `delete_transaction`.
    DeleteTransaction(Identifier),
}

impl ToolRequest {
    /// Returns the tool this request targets.
    #[must_use]
    pub const fn tool(&self) -> ToolName {
        match self {
            Self::CreateAccountHolder(_) => ToolName::CreateAccountHolder,
            Self::EnrichTransaction(_) => ToolName::EnrichTransaction,
            Self::GetAccountHolder(_) => ToolName::GetAccountHolder,
            Self::ListTransactions(_) => ToolName::ListTransactions,
            Self::GetTransaction(_) => ToolName::GetTransaction,
            Self::BulkEnrichTransactions(_) => ToolName::BulkEnrichTransactions,
            Self::DeleteAccountHolder(_) => ToolName::DeleteAccountHolder,
            Self::DeleteTransaction(_) => ToolName::DeleteTransaction,
        }
    }
}

/// One coerced argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Canonical identifier.
    Identifier(Identifier),
    /// Normalized text: free text, dates, currency codes, and choice labels.
    Text(String),
    /// Decimal amount.
    Amount(Number),
    /// Non-negative count.
    Count(u64),
    /// Optional upper-cased country code.
    Country(Option<String>),
    /// Validated transaction batch.
    Batch(Vec<TransactionInput>),
}

/// Arguments after coercion and defaulting, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedArgs {
    /// Coerced values; every declared parameter is present.
    values: BTreeMap<&'static str, ArgValue>,
}

impl ValidatedArgs {
    /// Returns a coerced value by parameter name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    /// Returns an identifier argument.
    fn identifier(&self, name: &str) -> Result<Identifier, ValidationError> {
        match self.values.get(name) {
            Some(ArgValue::Identifier(id)) => Ok(id.clone()),
            _ => Err(ValidationError::mismatch(name, ParamType::Identifier)),
        }
    }

    /// Returns a text argument.
    fn text(&self, name: &str) -> Result<String, ValidationError> {
        match self.values.get(name) {
            Some(ArgValue::Text(text)) => Ok(text.clone()),
            _ => Err(ValidationError::mismatch(name, ParamType::Text)),
        }
    }

    /// Returns an amount argument.
    fn amount(&self, name: &str) -> Result<Number, ValidationError> {
        match self.values.get(name) {
            Some(ArgValue::Amount(amount)) => Ok(amount.clone()),
            _ => Err(ValidationError::mismatch(name, ParamType::Amount)),
        }
    }

    /// Returns a count argument.
    fn count(&self, name: &str) -> Result<u64, ValidationError> {
        match self.values.get(name) {
            Some(ArgValue::Count(count)) => Ok(*count),
            _ => Err(ValidationError::mismatch(name, ParamType::Count { minimum: 0 })),
        }
    }

    /// Returns a country argument.
    fn country(&self, name: &str) -> Result<Option<String>, ValidationError> {
        match self.values.get(name) {
            Some(ArgValue::Country(country)) => Ok(country.clone()),
            _ => Err(ValidationError::mismatch(name, ParamType::Country)),
        }
    }

    /// Removes and returns a batch argument.
    fn take_batch(&mut self, name: &str) -> Result<Vec<TransactionInput>, ValidationError> {
        match self.values.remove(name) {
            Some(ArgValue::Batch(batch)) => Ok(batch),
            _ => Err(ValidationError::mismatch(name, ParamType::TransactionBatch)),
        }
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Contract-driven argument validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidator;

impl RequestValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates raw arguments and builds the typed request.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] naming the first offending field.
    pub fn validate(
        &self,
        contract: &ToolContract,
        raw: &Value,
    ) -> Result<ToolRequest, ValidationError> {
        let args = self.validate_args(contract, raw)?;
        build_request(contract.name, args)
    }

    /// Validates raw arguments against the contract's parameter list.
    ///
    /// A `null` payload is treated as an empty argument object.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] naming the first offending field.
    pub fn validate_args(
        &self,
        contract: &ToolContract,
        raw: &Value,
    ) -> Result<ValidatedArgs, ValidationError> {
        let empty = Map::new();
        let map = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(ValidationError::TypeMismatch {
                    field: ARGUMENTS_FIELD.to_string(),
                    expected: "object",
                });
            }
        };
        validate_object(&contract.params, map, "")
    }
}

/// Validates one argument object against ordered parameter declarations.
///
/// Keys the declarations do not name are ignored.
fn validate_object(
    params: &[ParamSpec],
    map: &Map<String, Value>,
    prefix: &str,
) -> Result<ValidatedArgs, ValidationError> {
    let mut values = BTreeMap::new();
    for param in params {
        let field = field_path(prefix, param.name);
        let value = match map.get(param.name).filter(|value| !value.is_null()) {
            Some(value) => coerce(param.param_type, value, &field)?,
            None if param.required => return Err(ValidationError::MissingParameter { field }),
            None => default_value(param, &field)?,
        };
        values.insert(param.name, value);
    }
    Ok(ValidatedArgs { values })
}

/// Returns the declared default of an optional parameter.
fn default_value(param: &ParamSpec, field: &str) -> Result<ArgValue, ValidationError> {
    match (&param.default, param.param_type) {
        (Some(Value::Null) | None, ParamType::Country) => Ok(ArgValue::Country(None)),
        (Some(default), _) if !default.is_null() => coerce(param.param_type, default, field),
        _ => Err(ValidationError::MissingParameter { field: field.to_string() }),
    }
}

/// Coerces one value to its semantic type.
fn coerce(param_type: ParamType, value: &Value, field: &str) -> Result<ArgValue, ValidationError> {
    let mismatch = || ValidationError::mismatch(field, param_type);
    match param_type {
        ParamType::Identifier => {
            Identifier::from_json(value).map(ArgValue::Identifier).ok_or_else(mismatch)
        }
        ParamType::Text => value
            .as_str()
            .filter(|text| !text.trim().is_empty())
            .map(|text| ArgValue::Text(text.to_string()))
            .ok_or_else(mismatch),
        ParamType::Date => value
            .as_str()
            .filter(|text| parse_date(text).is_some())
            .map(|text| ArgValue::Text(text.to_string()))
            .ok_or_else(mismatch),
        ParamType::Amount => parse_amount(value).map(ArgValue::Amount).ok_or_else(mismatch),
        ParamType::Currency => letter_code(value, 3).map(ArgValue::Text).ok_or_else(mismatch),
        ParamType::Country => {
            letter_code(value, 2).map(|code| ArgValue::Country(Some(code))).ok_or_else(mismatch)
        }
        ParamType::Choice { options } => value
            .as_str()
            .map(str::to_ascii_lowercase)
            .filter(|label| options.contains(&label.as_str()))
            .map(ArgValue::Text)
            .ok_or_else(mismatch),
        ParamType::Count { minimum } => value
            .as_u64()
            .filter(|count| *count >= minimum)
            .map(ArgValue::Count)
            .ok_or_else(mismatch),
        ParamType::TransactionBatch => {
            let items = value.as_array().filter(|items| !items.is_empty()).ok_or_else(mismatch)?;
            let params = transaction_params();
            let batch = items
                .iter()
                .enumerate()
                .map(|(index, item)| batch_item(&params, item, &format!("{field}[{index}]")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ArgValue::Batch(batch))
        }
    }
}

/// Validates one bulk item; `location.country` stands in for a missing `country`.
fn batch_item(
    params: &[ParamSpec],
    item: &Value,
    prefix: &str,
) -> Result<TransactionInput, ValidationError> {
    let Value::Object(map) = item else {
        return Err(ValidationError::TypeMismatch { field: prefix.to_string(), expected: "object" });
    };
    let mut args = validate_object(params, map, prefix)?;
    if let Some(location) = map.get(LOCATION_KEY).filter(|value| !value.is_null()) {
        let nested = location_country(location, &field_path(prefix, LOCATION_KEY))?;
        if matches!(args.values.get("country"), Some(ArgValue::Country(None))) {
            args.values.insert("country", ArgValue::Country(nested));
        }
    }
    transaction_from(&args)
}

/// Extracts `country` from a bulk item's `location` object.
fn location_country(location: &Value, prefix: &str) -> Result<Option<String>, ValidationError> {
    let Value::Object(map) = location else {
        return Err(ValidationError::TypeMismatch { field: prefix.to_string(), expected: "object" });
    };
    match map.get("country").filter(|value| !value.is_null()) {
        Some(value) => match coerce(ParamType::Country, value, &field_path(prefix, "country"))? {
            ArgValue::Country(country) => Ok(country),
            _ => Ok(None),
        },
        None => Ok(None),
    }
}

// ============================================================================
// SECTION: Request Assembly
// ============================================================================

/// Builds the typed request for a tool from validated arguments.
fn build_request(tool: ToolName, mut args: ValidatedArgs) -> Result<ToolRequest, ValidationError> {
    let request = match tool {
        ToolName::CreateAccountHolder => {
            let label = args.text("type")?;
            let holder_type = AccountHolderType::parse(&label).ok_or_else(|| {
                ValidationError::mismatch(
                    "type",
                    ParamType::Choice { options: AccountHolderType::ACCEPTED_LABELS },
                )
            })?;
            ToolRequest::CreateAccountHolder(NewAccountHolder {
                id: args.identifier("id")?,
                holder_type,
                name: args.text("name")?,
            })
        }
        ToolName::EnrichTransaction => ToolRequest::EnrichTransaction(transaction_from(&args)?),
        ToolName::GetAccountHolder => {
            ToolRequest::GetAccountHolder(args.identifier("account_holder_id")?)
        }
        ToolName::ListTransactions => ToolRequest::ListTransactions(ListQuery {
            account_holder_id: args.identifier("account_holder_id")?,
            limit: args.count("limit")?,
            offset: args.count("offset")?,
        }),
        ToolName::GetTransaction => ToolRequest::GetTransaction(args.identifier("transaction_id")?),
        ToolName::BulkEnrichTransactions => {
            ToolRequest::BulkEnrichTransactions(args.take_batch("transactions")?)
        }
        ToolName::DeleteAccountHolder => {
            ToolRequest::DeleteAccountHolder(args.identifier("account_holder_id")?)
        }
        ToolName::DeleteTransaction => {
            ToolRequest::DeleteTransaction(args.identifier("transaction_id")?)
        }
    };
    Ok(request)
}

/// Builds a transaction from validated transaction arguments.
fn transaction_from(args: &ValidatedArgs) -> Result<TransactionInput, ValidationError> {
    let entry_label = args.text("entry_type")?;
    let entry_type = EntryType::parse(&entry_label).ok_or_else(|| {
        ValidationError::mismatch("entry_type", ParamType::Choice { options: EntryType::LABELS })
    })?;
    Ok(TransactionInput {
        id: args.identifier("id")?,
        description: args.text("description")?,
        date: args.text("date")?,
        amount: args.amount("amount")?,
        entry_type,
        currency: args.text("currency")?,
        account_holder_id: args.identifier("account_holder_id")?,
        country: args.country("country")?,
    })
}

// ============================================================================
// SECTION: Scalar Parsers
// ============================================================================

/// Joins a field path.
fn field_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") }
}

/// Parses a `YYYY-MM-DD` calendar date.
fn parse_date(text: &str) -> Option<Date> {
    if text.len() != 10 {
        return None;
    }
    Date::parse(text, DATE_FORMAT).ok()
}

/// Parses an amount from a JSON number or a numeric string.
fn parse_amount(value: &Value) -> Option<Number> {
    match value {
        Value::Number(number) => Some(number.clone()),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            serde_json::from_str::<Number>(trimmed).ok()
        }
        _ => None,
    }
}

/// Returns an upper-cased ASCII letter code of exactly `len` letters.
fn letter_code(value: &Value, len: usize) -> Option<String> {
    value
        .as_str()
        .filter(|code| code.len() == len && code.bytes().all(|byte| byte.is_ascii_alphabetic()))
        .map(str::to_ascii_uppercase)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
