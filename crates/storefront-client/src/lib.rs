//! Typed HTTP client for the storefront API.

use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::de::DeserializeOwned;
use storefront_types::api::{
    AddToCartRequest, CreateOrderRequest, UpdateCartItemRequest, UpdateStatusRequest,
};
use storefront_types::domain::cart::{CartLine, CartView};
use storefront_types::domain::catalog::{
    Category, CategoryUpdate, NewCategory, NewProduct, Product, ProductFilter, ProductUpdate,
};
use storefront_types::domain::order::{Order, OrderDetails, OrderStatus};
use storefront_types::envelope::ApiResponse;
use uuid::Uuid;

/// A failure reported by the server: the HTTP status plus the envelope message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

#[derive(Clone)]
pub struct StorefrontClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct StorefrontClient {
    base: Url,
    client: reqwest::Client,
}

async fn read<T: DeserializeOwned>(res: reqwest::Response) -> anyhow::Result<ApiResponse<T>> {
    let status = res.status();
    let envelope: ApiResponse<T> = res
        .json()
        .await
        .with_context(|| format!("unreadable response body ({status})"))?;
    if !status.is_success() || !envelope.success {
        tracing::debug!(status = status.as_u16(), message = %envelope.message, "request failed");
        return Err(ApiError {
            status: status.as_u16(),
            message: envelope.message,
        }
        .into());
    }
    Ok(envelope)
}

async fn data<T: DeserializeOwned>(res: reqwest::Response) -> anyhow::Result<T> {
    read(res).await?.data.context("response carried no data")
}

impl StorefrontClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<StorefrontClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(StorefrontClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base url `{}` cannot carry a path", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn create_category(&self, input: &NewCategory) -> anyhow::Result<Category> {
        let res = self
            .client
            .post(self.url(&["categories"])?)
            .json(input)
            .send()
            .await?;
        data(res).await
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        input: &CategoryUpdate,
    ) -> anyhow::Result<Category> {
        let res = self
            .client
            .put(self.url(&["categories", &id.to_string()])?)
            .json(input)
            .send()
            .await?;
        data(res).await
    }

    pub async fn create_product(&self, input: &NewProduct) -> anyhow::Result<Product> {
        let res = self
            .client
            .post(self.url(&["products"])?)
            .json(input)
            .send()
            .await?;
        data(res).await
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>> {
        let res = self
            .client
            .get(self.url(&["products"])?)
            .query(filter)
            .send()
            .await?;
        data(res).await
    }

    pub async fn get_product(&self, id: Uuid) -> anyhow::Result<Product> {
        let res = self
            .client
            .get(self.url(&["products", &id.to_string()])?)
            .send()
            .await?;
        data(res).await
    }

    pub async fn update_product(&self, id: Uuid, input: &ProductUpdate) -> anyhow::Result<Product> {
        let res = self
            .client
            .put(self.url(&["products", &id.to_string()])?)
            .json(input)
            .send()
            .await?;
        data(res).await
    }

    pub async fn get_cart(&self, user_id: &str) -> anyhow::Result<CartView> {
        let res = self
            .client
            .get(self.url(&["cart", user_id])?)
            .send()
            .await?;
        data(res).await
    }

    pub async fn add_to_cart(
        &self,
        user_id: &str,
        product_id: Uuid,
        quantity: u32,
    ) -> anyhow::Result<CartLine> {
        let res = self
            .client
            .post(self.url(&["cart", user_id, "items"])?)
            .json(&AddToCartRequest {
                product_id,
                quantity,
            })
            .send()
            .await?;
        data(res).await
    }

    /// Returns `None` when the quantity removed the line.
    pub async fn update_cart_item(
        &self,
        item_id: Uuid,
        quantity: i64,
    ) -> anyhow::Result<Option<CartLine>> {
        let res = self
            .client
            .put(self.url(&["cart", "items", &item_id.to_string()])?)
            .json(&UpdateCartItemRequest { quantity })
            .send()
            .await?;
        Ok(read(res).await?.data)
    }

    pub async fn remove_cart_item(&self, item_id: Uuid) -> anyhow::Result<()> {
        let res = self
            .client
            .delete(self.url(&["cart", "items", &item_id.to_string()])?)
            .send()
            .await?;
        read::<()>(res).await?;
        Ok(())
    }

    pub async fn clear_cart(&self, user_id: &str) -> anyhow::Result<()> {
        let res = self
            .client
            .delete(self.url(&["cart", user_id])?)
            .send()
            .await?;
        read::<()>(res).await?;
        Ok(())
    }

    pub async fn cart_item_count(&self, user_id: &str) -> anyhow::Result<u64> {
        let res = self
            .client
            .get(self.url(&["cart", user_id, "count"])?)
            .send()
            .await?;
        data(res).await
    }

    pub async fn cart_total(&self, user_id: &str) -> anyhow::Result<i64> {
        let res = self
            .client
            .get(self.url(&["cart", user_id, "total"])?)
            .send()
            .await?;
        data(res).await
    }

    pub async fn checkout(&self, req: &CreateOrderRequest) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url(&["orders"])?)
            .json(req)
            .send()
            .await?;
        data(res).await
    }

    pub async fn get_order(&self, id: Uuid) -> anyhow::Result<OrderDetails> {
        let res = self
            .client
            .get(self.url(&["orders", &id.to_string()])?)
            .send()
            .await?;
        data(res).await
    }

    pub async fn get_order_by_number(&self, order_number: &str) -> anyhow::Result<OrderDetails> {
        let res = self
            .client
            .get(self.url(&["orders", "number", order_number])?)
            .send()
            .await?;
        data(res).await
    }

    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> anyhow::Result<Vec<OrderDetails>> {
        let mut req = self.client.get(self.url(&["orders"])?);
        if let Some(status) = status {
            req = req.query(&[("status", status.as_str())]);
        }
        data(req.send().await?).await
    }

    pub async fn list_user_orders(&self, user_id: &str) -> anyhow::Result<Vec<OrderDetails>> {
        let res = self
            .client
            .get(self.url(&["orders", "user", user_id])?)
            .send()
            .await?;
        data(res).await
    }

    pub async fn update_status(&self, id: Uuid, status: OrderStatus) -> anyhow::Result<Order> {
        let res = self
            .client
            .patch(self.url(&["orders", &id.to_string(), "status"])?)
            .json(&UpdateStatusRequest { status })
            .send()
            .await?;
        data(res).await
    }

    pub async fn cancel_order(&self, id: Uuid) -> anyhow::Result<()> {
        let res = self
            .client
            .post(self.url(&["orders", &id.to_string(), "cancel"])?)
            .send()
            .await?;
        read::<()>(res).await?;
        Ok(())
    }

    pub async fn mark_order_paid(&self, id: Uuid) -> anyhow::Result<()> {
        let res = self
            .client
            .post(self.url(&["orders", &id.to_string(), "paid"])?)
            .send()
            .await?;
        read::<()>(res).await?;
        Ok(())
    }
}

impl StorefrontClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<StorefrontClient> {
        if let Some(client) = self.client {
            return Ok(StorefrontClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(StorefrontClient {
            base: self.base,
            client,
        })
    }
}
