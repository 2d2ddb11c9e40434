use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::domain::format_usd;
use crate::validation::AMOUNT_INPUT_MAX_LEN;

/// One selectable preset, e.g. `$0.10`.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetAmount {
    pub value: BigDecimal,
    pub label: String,
}

impl PresetAmount {
    pub fn new(value: BigDecimal) -> Self {
        let label = preset_label(&value);
        Self { value, label }
    }
}

/// Whole-dollar presets read `$5`, fractional ones `$0.10`.
fn preset_label(value: &BigDecimal) -> String {
    let whole = value.with_scale(0);
    if &whole == value {
        format!("${}", whole)
    } else {
        format_usd(value)
    }
}

pub fn default_presets() -> Vec<PresetAmount> {
    ["0.1", "1", "5", "10"]
        .iter()
        .filter_map(|raw| BigDecimal::from_str(raw).ok())
        .map(PresetAmount::new)
        .collect()
}

/// Holds the active tip amount, picked from presets or typed in.
#[derive(Debug, Clone)]
pub struct AmountSelector {
    presets: Vec<PresetAmount>,
    default: BigDecimal,
    active: BigDecimal,
    custom: String,
}

impl AmountSelector {
    pub fn new(presets: Vec<PresetAmount>, default: BigDecimal) -> Self {
        Self {
            presets,
            active: default.clone(),
            default,
            custom: String::new(),
        }
    }

    pub fn presets(&self) -> &[PresetAmount] {
        &self.presets
    }

    /// Returns `false` and leaves the state alone for values that are not presets.
    pub fn select_preset(&mut self, amount: &BigDecimal) -> bool {
        let Some(preset) = self.presets.iter().find(|p| &p.value == amount) else {
            return false;
        };
        self.active = preset.value.clone();
        self.custom.clear();
        true
    }

    /// Unparseable, negative, or oversized input makes the amount zero.
    pub fn set_custom(&mut self, text: &str) {
        self.custom = text.to_string();
        self.active = parse_amount(text).unwrap_or_else(|| BigDecimal::from(0));
    }

    pub fn value(&self) -> &BigDecimal {
        &self.active
    }

    pub fn custom_text(&self) -> &str {
        &self.custom
    }

    pub fn is_preset_active(&self, amount: &BigDecimal) -> bool {
        self.custom.is_empty() && &self.active == amount
    }

    pub fn is_valid(&self) -> bool {
        self.active > BigDecimal::from(0)
    }

    pub fn reset(&mut self) {
        self.active = self.default.clone();
        self.custom.clear();
    }
}

impl Default for AmountSelector {
    fn default() -> Self {
        Self::new(default_presets(), BigDecimal::from(1))
    }
}

/// Plain decimals only: digits with at most one `.`, no sign or exponent.
fn is_plain_decimal(text: &str) -> bool {
    let mut parts = text.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();
    (!whole.is_empty() || !fraction.is_empty())
        && whole.chars().all(|ch| ch.is_ascii_digit())
        && fraction.chars().all(|ch| ch.is_ascii_digit())
}

fn parse_amount(text: &str) -> Option<BigDecimal> {
    let text = text.trim();
    if text.is_empty() || text.len() > AMOUNT_INPUT_MAX_LEN || !is_plain_decimal(text) {
        return None;
    }
    let value = BigDecimal::from_str(text).ok()?;
    (value > BigDecimal::from(0)).then_some(value)
}
