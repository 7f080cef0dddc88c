// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source query for the production workflow.

use chrono::NaiveDate;
use etl_agent_config::ProductionConfig;
use etl_agent_core::DATE_FORMAT;

/// Filters applied to the payer-details facts.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractQuery {
	pub products: Vec<String>,
	pub dispositions: Vec<String>,
	/// Exclusive lower bound on `pa_completed_date`.
	pub completed_after: NaiveDate,
}

/// Quote a value as a SQL string literal.
pub fn quote_literal(value: &str) -> String {
	format!("'{}'", value.replace('\'', "''"))
}

fn literal_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
	values
		.into_iter()
		.map(quote_literal)
		.collect::<Vec<_>>()
		.join(", ")
}

impl ExtractQuery {
	pub fn from_config(config: &ProductionConfig) -> Self {
		Self {
			products: config.products.clone(),
			dispositions: config.dispositions.clone(),
			completed_after: config.completed_after,
		}
	}

	pub fn to_sql(&self) -> String {
		let products: Vec<String> = self.products.iter().map(|p| p.trim().to_uppercase()).collect();
		let products = literal_list(products.iter().map(String::as_str));
		let dispositions = literal_list(self.dispositions.iter().map(String::as_str));
		let completed_after = quote_literal(&self.completed_after.format(DATE_FORMAT).to_string());

		format!(
			r#"SELECT DISTINCT
    CURRENT_DATE::date AS JCAP_table_loaddate,
    p.pmc_patid::varchar AS pmc_patid,
    u.managing_hcp_state AS REFERRING_HCP_PATH_STATE,
    p.prod_nm AS DrugorTherapy,
    p.pa_completed_date::date AS PA_CompletedDate,
    p.pa_initiated_date::date AS PA_InitiatedDate,
    p.pa_disposition AS PADisposition,
    p.appeal_disposition AS AppealDisposition,
    p.fe_required AS FEREquired,
    p.rx_planname AS rx_PlanName,
    p.rx_payername AS rx_PayerName,
    p.rx_payertype AS rx_PayerType,
    p.sr_type AS srtype,
    p.load_date::date AS load_date,
    p.ins_planname AS insurancebenefitplanname,
    p.pbm_name AS pbmpayername,
    c.lhm_name AS LHM_Name,
    c.bd_terrname AS region,
    s.dynamic_segment AS segment
FROM (
    SELECT * FROM cdp.fct_pah_pa_payer_details
    WHERE UPPER(prod_nm) IN ({products})
    AND pa_disposition IN ({dispositions})
) p
LEFT JOIN (
    SELECT DISTINCT pmc_patid, prod_nm, managing_hcp_state, managing_hcp_zip, managing_hcp_jnj_id
    FROM cdp.fct_pah_ref_cap_dly
) u ON p.pmc_patid = u.pmc_patid AND UPPER(p.prod_nm) = UPPER(u.prod_nm)
LEFT JOIN (
    SELECT * FROM cdp.dmn_pah_curr_alignment_all
) c ON u.managing_hcp_zip = c.zip
LEFT JOIN (
    SELECT jnj_id, dynamic_segment FROM cdp.dmn_pah_segment WHERE actv_flag = '1'
) s ON u.managing_hcp_jnj_id = s.jnj_id
WHERE p.pa_completed_date > {completed_after}
AND p.pa_completed_date <= CURRENT_DATE"#
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_literals_double_embedded_quotes() {
		assert_eq!(quote_literal("Approved"), "'Approved'");
		assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
	}

	#[test]
	fn test_default_filters_are_rendered() {
		let sql = ExtractQuery::from_config(&ProductionConfig::default()).to_sql();
		assert!(sql.contains("UPPER(prod_nm) IN ('OPSUMIT', 'UPTRAVI', 'OPSYNVI')"));
		assert!(sql.contains("pa_disposition IN ('Approved', 'Denied')"));
		assert!(sql.contains("p.pa_completed_date > '2024-12-31'"));
		assert!(sql.contains("<= CURRENT_DATE"));
		assert!(sql.starts_with("SELECT DISTINCT"));
	}

	#[test]
	fn test_products_are_upper_cased() {
		let query = ExtractQuery {
			products: vec![" uptravi ".to_string()],
			dispositions: vec!["Denied".to_string()],
			completed_after: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
		};
		let sql = query.to_sql();
		assert!(sql.contains("IN ('UPTRAVI')"));
		assert!(sql.contains("> '2025-01-31'"));
	}
}
