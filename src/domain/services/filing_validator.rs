// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::filing::Filing;
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

static ACCESSION_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{10}-\d{2}-\d{6}$").expect("valid accession number pattern"));
static CIK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,10}$").expect("valid cik pattern"));
static CUSIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Z]{9}$").expect("valid cusip pattern"));

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    /// 按检查顺序排列的错误信息
    pub errors: Vec<String>,
}

/// 持仓级别的必填规则，取决于下游用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    /// 合并查询按 CUSIP 分组，缺失 CUSIP 的持仓无法合并
    pub require_cusip: bool,
    pub require_value: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            require_cusip: true,
            require_value: false,
        }
    }
}

/// 报告校验器
///
/// 只读、无副作用。
#[derive(Debug, Clone, Default)]
pub struct FilingValidator {
    rules: ValidationRules,
}

impl FilingValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    /// 以今天（UTC）为基准校验报告
    pub fn validate(&self, filing: &Filing) -> ValidationResult {
        self.validate_at(filing, Utc::now().date_naive())
    }

    /// 以给定日期为基准校验报告
    ///
    /// # 参数
    ///
    /// * `filing` - 待校验的报告
    /// * `today` - 判断“未来日期”的基准
    pub fn validate_at(&self, filing: &Filing, today: NaiveDate) -> ValidationResult {
        let mut errors = Vec::new();

        let accession = filing.accession_number.trim();
        if accession.is_empty() {
            errors.push("accession number is missing".to_string());
        } else if !ACCESSION_NUMBER.is_match(accession) {
            errors.push(format!("accession number '{}' is malformed", accession));
        }

        let cik = filing.cik.trim();
        if cik.is_empty() {
            errors.push("CIK is missing".to_string());
        } else if !CIK.is_match(cik) {
            errors.push(format!("CIK '{}' is malformed", cik));
        }

        match filing.filing_date {
            None => errors.push("filing date is missing".to_string()),
            Some(date) if date > today => {
                errors.push(format!("filing date {} is in the future", date))
            }
            Some(_) => {}
        }

        if let Some(period) = filing.report_period {
            if period > today {
                errors.push(format!("report period {} is in the future", period));
            }
        }

        for (i, holding) in filing.holdings.iter().enumerate() {
            let n = i + 1;
            match holding.cusip.as_deref() {
                None if self.rules.require_cusip => {
                    errors.push(format!("holding {}: CUSIP is missing", n))
                }
                Some(cusip) if !CUSIP.is_match(cusip) => {
                    errors.push(format!("holding {}: CUSIP '{}' is malformed", n, cusip))
                }
                _ => {}
            }
            match holding.value {
                None if self.rules.require_value => {
                    errors.push(format!("holding {}: value is missing", n))
                }
                Some(value) if value < Decimal::ZERO => {
                    errors.push(format!("holding {}: value {} is negative", n, value))
                }
                _ => {}
            }
            if let Some(shares) = holding.shares.filter(|s| *s < 0) {
                errors.push(format!("holding {}: share amount {} is negative", n, shares));
            }
        }

        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }
}
