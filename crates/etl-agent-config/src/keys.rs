// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key names of settings that job types require.

pub const SOURCE_WAREHOUSE_HOST: &str = "ETL_AGENT_SOURCE_WAREHOUSE_HOST";
pub const SOURCE_WAREHOUSE_DATABASE: &str = "ETL_AGENT_SOURCE_WAREHOUSE_DATABASE";
pub const SOURCE_WAREHOUSE_USER: &str = "ETL_AGENT_SOURCE_WAREHOUSE_USER";
pub const SOURCE_WAREHOUSE_PASSWORD: &str = "ETL_AGENT_SOURCE_WAREHOUSE_PASSWORD";

pub const DESTINATION_WAREHOUSE_HOST: &str = "ETL_AGENT_DESTINATION_WAREHOUSE_HOST";
pub const DESTINATION_WAREHOUSE_DATABASE: &str = "ETL_AGENT_DESTINATION_WAREHOUSE_DATABASE";
pub const DESTINATION_WAREHOUSE_USER: &str = "ETL_AGENT_DESTINATION_WAREHOUSE_USER";
pub const DESTINATION_WAREHOUSE_PASSWORD: &str = "ETL_AGENT_DESTINATION_WAREHOUSE_PASSWORD";

pub const DEV_WAREHOUSE_HOST: &str = "ETL_AGENT_DEV_WAREHOUSE_HOST";
pub const DEV_WAREHOUSE_DATABASE: &str = "ETL_AGENT_DEV_WAREHOUSE_DATABASE";
pub const DEV_WAREHOUSE_USER: &str = "ETL_AGENT_DEV_WAREHOUSE_USER";
pub const DEV_WAREHOUSE_PASSWORD: &str = "ETL_AGENT_DEV_WAREHOUSE_PASSWORD";

pub const OBJECT_STORE_BUCKET: &str = "ETL_AGENT_OBJECT_STORE_BUCKET";
pub const OBJECT_STORE_ROLE_ARN: &str = "ETL_AGENT_OBJECT_STORE_ROLE_ARN";
