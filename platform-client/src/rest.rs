//! PostgREST-style HTTP implementation of [`PlatformApi`].
//!
//! The hosted platform exposes its tables under `/rest/v1/<table>` with
//! query-string filters and remote procedures under `/rest/v1/rpc/<name>`.
//! Catalog tables are fetched separately and joined client-side; the result
//! is immutable for the life of the process, so the engine fetches it once
//! at startup.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::{
    Attribute, AttributeValue, Configuration, DailyQuota, MediaRow, Order, OrderLine, OrderStatus,
    Product, ServiceWindow, ValidCombination,
};
use tracing::debug;

use crate::api::PlatformApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Network client for the hosted platform.
#[derive(Debug, Clone)]
pub struct RestPlatform {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestPlatform {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        if config.base_url.is_empty() {
            return Err(ClientError::Config("base_url is empty".into()));
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
                _ => Err(ClientError::Api {
                    status: status.as_u16(),
                    message: body,
                }),
            };
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        want_representation: bool,
    ) -> ClientResult<T> {
        let mut req = self
            .client
            .post(self.url(path))
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(body);
        if want_representation {
            req = req.header("Prefer", "return=representation");
        }
        let response = req.send().await?;
        self.handle_response(response).await
    }

    /// POST where the platform responds with no body on success.
    async fn post_no_content<B: Serialize + Sync>(&self, path: &str, body: &B) -> ClientResult<()> {
        let response = self
            .client
            .post(self.url(path))
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }

    async fn patch<B: Serialize + Sync>(&self, path: &str, body: &B) -> ClientResult<()> {
        let response = self
            .client
            .patch(self.url(path))
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }

    fn in_filter(ids: &[i64]) -> String {
        let list: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        format!("in.({})", list.join(","))
    }
}

// ========== Table row shapes ==========

#[derive(Debug, Deserialize)]
struct ProductRow {
    id: i64,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct AttributeRow {
    id: i64,
    product_id: i64,
    config_key: String,
    name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    display_order: i32,
}

#[derive(Debug, Deserialize)]
struct ValueRow {
    id: i64,
    attribute_id: i64,
    value: String,
    description: Option<String>,
    #[serde(default)]
    display_order: i32,
    #[serde(default = "default_true")]
    visible: bool,
}

#[derive(Debug, Deserialize)]
struct CombinationRow {
    id: i64,
    product_id: i64,
    configuration: HashMap<String, String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaRowDto {
    id: i64,
    product_id: i64,
    configuration: HashMap<String, String>,
    image_url: Option<String>,
    code: Option<String>,
    #[serde(default)]
    is_default: bool,
}

#[derive(Debug, Deserialize)]
struct DefaultImageRow {
    id: i64,
    #[serde(default)]
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct ServiceConfigRow {
    opens_at: Option<String>,
    closes_at: Option<String>,
    #[serde(default)]
    excluded_days: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OrderHeaderRow {
    id: i64,
    user_id: String,
    number: Option<i64>,
    placed_at: i64,
    status: OrderStatus,
    #[serde(default)]
    order_lines: Vec<OrderLineRow>,
}

#[derive(Debug, Deserialize)]
struct OrderLineRow {
    product_id: i64,
    product_name: String,
    configuration: HashMap<String, String>,
    image_url: Option<String>,
    quantity: u32,
}

fn default_true() -> bool {
    true
}

fn to_configuration(raw: HashMap<String, String>) -> Configuration {
    raw.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

#[async_trait]
impl PlatformApi for RestPlatform {
    async fn fetch_catalog(&self) -> ClientResult<Vec<Product>> {
        let products: Vec<ProductRow> = self
            .get("products?visible=eq.true&order=display_order.asc,id.asc")
            .await?;
        let attributes: Vec<AttributeRow> = self
            .get("product_attributes?visible=eq.true&order=display_order.asc,id.asc")
            .await?;
        let values: Vec<ValueRow> = self
            .get("attribute_values?visible=eq.true&order=display_order.asc,id.asc")
            .await?;
        let combinations: Vec<CombinationRow> =
            self.get("valid_combinations?order=id.asc").await?;
        debug!(
            products = products.len(),
            attributes = attributes.len(),
            combinations = combinations.len(),
            "catalog fetched"
        );

        let catalog = products
            .into_iter()
            .map(|p| {
                let attrs: Vec<Attribute> = attributes
                    .iter()
                    .filter(|a| a.product_id == p.id)
                    .map(|a| Attribute {
                        attribute_id: a.id,
                        product_id: a.product_id,
                        config_key: shared::configuration::normalize(&a.config_key),
                        name: a.name.clone(),
                        required: a.required,
                        display_order: a.display_order,
                    })
                    .collect();
                let attr_ids: Vec<i64> = attrs.iter().map(|a| a.attribute_id).collect();
                let vals: Vec<AttributeValue> = values
                    .iter()
                    .filter(|v| attr_ids.contains(&v.attribute_id))
                    .map(|v| AttributeValue {
                        value_id: v.id,
                        attribute_id: v.attribute_id,
                        value: v.value.clone(),
                        description: v.description.clone(),
                        display_order: v.display_order,
                        visible: v.visible,
                    })
                    .collect();
                let combos: Vec<ValidCombination> = combinations
                    .iter()
                    .filter(|c| c.product_id == p.id)
                    .map(|c| ValidCombination {
                        id: c.id,
                        product_id: c.product_id,
                        configuration: to_configuration(c.configuration.clone()),
                        code: c.code.clone(),
                    })
                    .collect();
                Product {
                    id: p.id,
                    name: p.name,
                    description: p.description,
                    default_image: p.image_url,
                    attributes: attrs,
                    values: vals,
                    combinations: combos,
                }
            })
            .collect();
        Ok(catalog)
    }

    async fn fetch_media_rows(&self, product_ids: &[i64]) -> ClientResult<Vec<MediaRow>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!("product_media?product_id={}", Self::in_filter(product_ids));
        let rows: Vec<MediaRowDto> = self.get(&path).await?;
        Ok(rows
            .into_iter()
            .map(|r| MediaRow {
                id: r.id,
                product_id: r.product_id,
                configuration: to_configuration(r.configuration),
                image_url: r.image_url,
                code: r.code,
                is_default: r.is_default,
            })
            .collect())
    }

    async fn fetch_default_images(
        &self,
        product_ids: &[i64],
    ) -> ClientResult<HashMap<i64, String>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let path = format!(
            "products?select=id,image_url&id={}",
            Self::in_filter(product_ids)
        );
        let rows: Vec<DefaultImageRow> = self.get(&path).await?;
        Ok(rows.into_iter().map(|r| (r.id, r.image_url)).collect())
    }

    async fn fetch_service_window(&self) -> ClientResult<ServiceWindow> {
        let rows: Vec<ServiceConfigRow> = self.get("service_config?select=*").await?;
        let defaults = ServiceWindow::default();
        Ok(rows
            .into_iter()
            .next()
            .map(|r| ServiceWindow {
                opens_at: r.opens_at.unwrap_or(defaults.opens_at.clone()),
                closes_at: r.closes_at.unwrap_or(defaults.closes_at.clone()),
                excluded_days: r.excluded_days,
            })
            .unwrap_or_default())
    }

    async fn daily_quota(&self, user_id: &str) -> ClientResult<DailyQuota> {
        self.post("rpc/daily_quota", &serde_json::json!({ "user_id": user_id }), false)
            .await
    }

    async fn insert_order(&self, user_id: &str) -> ClientResult<i64> {
        #[derive(Deserialize)]
        struct Inserted {
            id: i64,
        }
        let body = serde_json::json!({
            "user_id": user_id,
            "status": OrderStatus::Submitted,
        });
        let rows: Vec<Inserted> = self.post("orders", &body, true).await?;
        rows.first()
            .map(|r| r.id)
            .ok_or_else(|| ClientError::NotFound("inserted order id missing".into()))
    }

    async fn insert_order_lines(&self, order_id: i64, lines: &[OrderLine]) -> ClientResult<()> {
        let body: Vec<serde_json::Value> = lines
            .iter()
            .map(|l| {
                serde_json::json!({
                    "order_id": order_id,
                    "product_id": l.product_id,
                    "product_name": l.product_name,
                    "configuration": l.configuration,
                    "image_url": l.image_url,
                    "quantity": l.quantity,
                })
            })
            .collect();
        self.post_no_content("order_lines", &body).await
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> ClientResult<()> {
        let path = format!("orders?id=eq.{}", order_id);
        self.patch(&path, &serde_json::json!({ "status": status }))
            .await
    }

    async fn fetch_order_history(&self, user_id: &str) -> ClientResult<Vec<Order>> {
        let path = format!(
            "orders?select=*,order_lines(*)&user_id=eq.{}&order=placed_at.desc",
            user_id
        );
        let rows: Vec<OrderHeaderRow> = self.get(&path).await?;
        Ok(rows
            .into_iter()
            .map(|r| Order {
                id: r.id,
                user_id: r.user_id,
                number: r.number,
                placed_at: r.placed_at,
                status: r.status,
                lines: r
                    .order_lines
                    .into_iter()
                    .map(|l| OrderLine {
                        product_id: l.product_id,
                        product_name: l.product_name,
                        configuration: to_configuration(l.configuration),
                        image_url: l.image_url,
                        quantity: l.quantity,
                    })
                    .collect(),
            })
            .collect())
    }
}
