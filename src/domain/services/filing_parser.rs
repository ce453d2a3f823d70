// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::filing::{Filing, FilingIndex, FilingReference, Holding};
use chrono::NaiveDate;
use roxmltree::{Document, Node, ParsingOptions};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// 申报日期格式
pub const FILING_DATE_FORMAT: &str = "%Y-%m-%d";
/// 13F 主文档中 periodOfReport 的格式
pub const REPORT_PERIOD_FORMAT: &str = "%m-%d-%Y";

/// 文档级解析错误
///
/// 只有文档本身无法作为格式良好的 XML 加载时才会产生。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// 文档为空
    #[error("Document is empty")]
    Empty,
    /// 文档不是格式良好的 XML
    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// 字段级的非致命解析问题
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    /// 持仓记录在文档中的序号（从 0 开始），文档级字段为空
    pub record: Option<usize>,
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record {
            Some(record) => write!(
                f,
                "record {}: field '{}' value '{}': {}",
                record, self.field, self.value, self.reason
            ),
            None => write!(f, "field '{}' value '{}': {}", self.field, self.value, self.reason),
        }
    }
}

/// 解析结果
#[derive(Debug, Clone)]
pub struct ParsedFiling {
    pub filing: Filing,
    pub warnings: Vec<ParseWarning>,
}

/// 单条持仓记录无法提取时的原因
#[derive(Debug)]
enum RecordError {
    /// 记录中没有任何可识别的子元素
    NoKnownFields,
}

/// 13F 文档解析器
///
/// 按元素本地名匹配，忽略命名空间和未知元素。单个字段缺失或无法转换时
/// 置空并记录警告，不会中断整份文档。
pub struct FilingParser;

impl FilingParser {
    /// 解析 13F 信息表文档
    ///
    /// # 参数
    ///
    /// * `raw` - 原始 XML 文本
    /// * `cik` - 申报人 CIK
    /// * `company_name` - 公司名称（来自索引）
    ///
    /// # 返回值
    ///
    /// * `Ok(ParsedFiling)` - 解析出的报告及字段级警告
    /// * `Err(ParseError)` - 文档不是格式良好的 XML
    pub fn parse(
        raw: &str,
        cik: &str,
        company_name: Option<&str>,
    ) -> Result<ParsedFiling, ParseError> {
        let doc = load(raw)?;
        let root = doc.root_element();
        let mut warnings = Vec::new();

        let mut filing = Filing::new(cik, header_text(root, "accessionNumber").unwrap_or_default());
        filing.company_name = company_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        filing.filing_type = header_text(root, "submissionType");
        filing.filing_date = header_text(root, "filingDate").and_then(|text| {
            parse_date(&text, FILING_DATE_FORMAT, None, "filingDate", &mut warnings)
        });
        filing.report_period = header_text(root, "periodOfReport").and_then(|text| {
            parse_date(&text, REPORT_PERIOD_FORMAT, None, "periodOfReport", &mut warnings)
        });

        let records = root
            .descendants()
            .filter(|node| node.is_element() && is_named(*node, "infoTable"));

        for (index, record) in records.enumerate() {
            match extract_holding(record, index, &mut warnings) {
                Ok(holding) => filing.holdings.push(holding),
                Err(RecordError::NoKnownFields) => warnings.push(ParseWarning {
                    record: Some(index),
                    field: "infoTable",
                    value: String::new(),
                    reason: "record has no recognised fields, dropped".to_string(),
                }),
            }
        }

        debug!(
            cik = cik,
            holdings = filing.holdings.len(),
            warnings = warnings.len(),
            "Parsed filing document"
        );

        Ok(ParsedFiling { filing, warnings })
    }

    /// 解析 EDGAR Atom 格式的申报人索引
    ///
    /// 缺少 accession number 的条目会被跳过。
    pub fn parse_filing_index(raw: &str) -> Result<FilingIndex, ParseError> {
        let doc = load(raw)?;
        let root = doc.root_element();

        let company_name = header_text(root, "conformed-name");
        let mut references = Vec::new();

        for entry in root
            .descendants()
            .filter(|node| node.is_element() && is_named(*node, "entry"))
        {
            let Some(accession_number) = child_text(entry, "accession-number") else {
                debug!("Skipping index entry without accession number");
                continue;
            };

            let filing_type = child_text(entry, "filing-type").or_else(|| {
                entry
                    .descendants()
                    .find(|node| node.is_element() && is_named(*node, "category"))
                    .and_then(|node| node.attribute("term"))
                    .map(str::to_string)
            });
            let filing_date = child_text(entry, "filing-date")
                .and_then(|text| NaiveDate::parse_from_str(&text, FILING_DATE_FORMAT).ok());

            references.push(FilingReference {
                accession_number,
                filing_type,
                filing_date,
                filing_href: child_text(entry, "filing-href"),
            });
        }

        Ok(FilingIndex {
            company_name,
            references,
        })
    }
}

fn load(raw: &str) -> Result<Document<'_>, ParseError> {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    Document::parse_with_options(trimmed, options).map_err(|e| ParseError::Malformed(e.to_string()))
}

fn is_named(node: Node<'_, '_>, name: &str) -> bool {
    node.tag_name().name().eq_ignore_ascii_case(name)
}

fn element_text(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// 文档中第一个同名元素的文本，跳过持仓记录内部
fn header_text(root: Node<'_, '_>, name: &str) -> Option<String> {
    root.descendants()
        .filter(|node| node.is_element() && is_named(*node, name))
        .find(|node| !node.ancestors().any(|a| a.is_element() && is_named(a, "infoTable")))
        .and_then(element_text)
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.descendants()
        .find(|n| n.is_element() && is_named(*n, name))
        .and_then(element_text)
}

fn extract_holding(
    record: Node<'_, '_>,
    index: usize,
    warnings: &mut Vec<ParseWarning>,
) -> Result<Holding, RecordError> {
    let mut holding = Holding::default();

    for node in record.descendants().filter(|n| n.is_element()) {
        let name = node.tag_name().name().to_ascii_lowercase();
        let slot_is_empty = match name.as_str() {
            "nameofissuer" => holding.issuer_name.is_none(),
            "titleofclass" => holding.title_of_class.is_none(),
            "cusip" => holding.cusip.is_none(),
            "value" => holding.value.is_none(),
            "sshprnamt" => holding.shares.is_none(),
            "sshprnamttype" => holding.share_type.is_none(),
            _ => continue,
        };
        if !slot_is_empty {
            continue;
        }
        let Some(text) = element_text(node) else {
            continue;
        };

        match name.as_str() {
            "nameofissuer" => holding.issuer_name = Some(text),
            "titleofclass" => holding.title_of_class = Some(text),
            "cusip" => holding.cusip = Some(text.to_ascii_uppercase()),
            "value" => holding.value = parse_decimal(&text, index, warnings),
            "sshprnamt" => holding.shares = parse_shares(&text, index, warnings),
            "sshprnamttype" => holding.share_type = Some(text.to_ascii_uppercase()),
            _ => {}
        }
    }

    if holding.is_empty() && !record_has_known_element(record) {
        return Err(RecordError::NoKnownFields);
    }
    Ok(holding)
}

fn record_has_known_element(record: Node<'_, '_>) -> bool {
    const KNOWN: [&str; 6] = [
        "nameOfIssuer",
        "titleOfClass",
        "cusip",
        "value",
        "sshPrnamt",
        "sshPrnamtType",
    ];
    record
        .descendants()
        .any(|n| n.is_element() && KNOWN.iter().any(|k| is_named(n, k)))
}

fn strip_number(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ',' | '$' | '_') && !c.is_whitespace())
        .collect()
}

fn parse_decimal(text: &str, record: usize, warnings: &mut Vec<ParseWarning>) -> Option<Decimal> {
    let cleaned = strip_number(text);
    let parsed = Decimal::from_str(&cleaned).or_else(|_| Decimal::from_scientific(&cleaned));
    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            warnings.push(ParseWarning {
                record: Some(record),
                field: "value",
                value: text.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}

fn parse_shares(text: &str, record: usize, warnings: &mut Vec<ParseWarning>) -> Option<i64> {
    let cleaned = strip_number(text);
    if let Ok(shares) = cleaned.parse::<i64>() {
        return Some(shares);
    }
    // "1000.0" and similar integral decimals are accepted
    let integral = Decimal::from_str(&cleaned)
        .ok()
        .filter(|d| d.fract().is_zero())
        .and_then(|d| d.to_i64());
    if integral.is_none() {
        warnings.push(ParseWarning {
            record: Some(record),
            field: "sshPrnamt",
            value: text.to_string(),
            reason: "not an integer share amount".to_string(),
        });
    }
    integral
}

fn parse_date(
    text: &str,
    format: &str,
    record: Option<usize>,
    field: &'static str,
    warnings: &mut Vec<ParseWarning>,
) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(text, format) {
        Ok(date) => Some(date),
        Err(e) => {
            warnings.push(ParseWarning {
                record,
                field,
                value: text.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
#[path = "filing_parser_test.rs"]
mod tests;
