// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The top-level configuration layer produced by every source.

use serde::Deserialize;

use crate::sections::{
	LoggingConfigLayer, NotifyConfigLayer, ObjectStoreConfigLayer, ProductionConfigLayer,
	SimpleConfigLayer, SmtpConfigLayer, WarehouseConfigLayer,
};

/// Partial agent configuration. Later layers override earlier ones field by field.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AgentConfigLayer {
	#[serde(default)]
	pub source_warehouse: Option<WarehouseConfigLayer>,
	#[serde(default)]
	pub destination_warehouse: Option<WarehouseConfigLayer>,
	#[serde(default)]
	pub dev_warehouse: Option<WarehouseConfigLayer>,
	#[serde(default)]
	pub object_store: Option<ObjectStoreConfigLayer>,
	#[serde(default)]
	pub smtp: Option<SmtpConfigLayer>,
	#[serde(default)]
	pub notify: Option<NotifyConfigLayer>,
	#[serde(default)]
	pub production: Option<ProductionConfigLayer>,
	#[serde(default)]
	pub simple: Option<SimpleConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T, F>(base: &mut Option<T>, other: Option<T>, merge: F)
where
	F: FnOnce(&mut T, T),
{
	match (base.as_mut(), other) {
		(Some(existing), Some(incoming)) => merge(existing, incoming),
		(None, Some(incoming)) => *base = Some(incoming),
		(_, None) => {}
	}
}

impl AgentConfigLayer {
	pub fn merge(&mut self, other: AgentConfigLayer) {
		merge_section(&mut self.source_warehouse, other.source_warehouse, WarehouseConfigLayer::merge);
		merge_section(
			&mut self.destination_warehouse,
			other.destination_warehouse,
			WarehouseConfigLayer::merge,
		);
		merge_section(&mut self.dev_warehouse, other.dev_warehouse, WarehouseConfigLayer::merge);
		merge_section(&mut self.object_store, other.object_store, ObjectStoreConfigLayer::merge);
		merge_section(&mut self.smtp, other.smtp, SmtpConfigLayer::merge);
		merge_section(&mut self.notify, other.notify, NotifyConfigLayer::merge);
		merge_section(&mut self.production, other.production, ProductionConfigLayer::merge);
		merge_section(&mut self.simple, other.simple, SimpleConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = AgentConfigLayer::default();
		base.merge(AgentConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: Some("debug".to_string()),
			}),
			..Default::default()
		});
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("debug"));
	}

	#[test]
	fn test_merge_is_field_level() {
		let mut base: AgentConfigLayer = toml::from_str(
			r#"
[source_warehouse]
host = "cdp.example.com"
database = "cdp"
"#,
		)
		.unwrap();
		let overlay: AgentConfigLayer = toml::from_str(
			r#"
[source_warehouse]
database = "cdp_prod"
"#,
		)
		.unwrap();
		base.merge(overlay);
		let wh = base.source_warehouse.unwrap();
		assert_eq!(wh.host.as_deref(), Some("cdp.example.com"));
		assert_eq!(wh.database.as_deref(), Some("cdp_prod"));
	}
}
