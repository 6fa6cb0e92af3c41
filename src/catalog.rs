use tracing::info;

use crate::models::image::CandidateImage;

/// Admin API caps `first` at 250 per page.
const MAX_PAGE_SIZE: u32 = 250;

const PRODUCTS_QUERY: &str = r#"
query Products($first: Int!) {
  products(first: $first, sortKey: UPDATED_AT) {
    edges {
      node {
        id
        title
        handle
        images(first: 1) { edges { node { id url altText } } }
      }
    }
  }
}
"#;

/// Shopify Admin GraphQL client used as the candidate source for ingestion.
pub struct ShopifyCatalog {
    api_version: String,
    access_token: Option<String>,
    http_client: reqwest::Client,
}

impl ShopifyCatalog {
    pub fn new(api_version: &str, access_token: Option<String>) -> Self {
        Self {
            api_version: api_version.to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.access_token.is_some()
    }

    /// Fetch up to `first` products with their lead image as ingestion
    /// candidates.
    pub async fn fetch_candidates(
        &self,
        shop: &str,
        first: u32,
    ) -> anyhow::Result<Vec<CandidateImage>> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("SHOPIFY_ADMIN_TOKEN is not set"))?;

        let first = first.clamp(1, MAX_PAGE_SIZE);
        let url = format!(
            "https://{shop}/admin/api/{}/graphql.json",
            self.api_version
        );

        let resp = self
            .http_client
            .post(&url)
            .header("X-Shopify-Access-Token", token)
            .json(&serde_json::json!({
                "query": PRODUCTS_QUERY,
                "variables": { "first": first },
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Admin API error ({status}): {body}");
        }

        let body: serde_json::Value = resp.json().await?;
        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            anyhow::bail!("Admin API returned errors: {errors}");
        }

        let candidates = parse_products(&body);
        info!("Fetched {} catalog candidates from {shop}", candidates.len());
        Ok(candidates)
    }
}

/// Map a `Products` query response onto candidates, keeping only products
/// that carry at least one image.
fn parse_products(body: &serde_json::Value) -> Vec<CandidateImage> {
    let edges = body
        .pointer("/data/products/edges")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    edges
        .iter()
        .filter_map(|edge| {
            let node = edge.get("node")?;
            let image = node.pointer("/images/edges/0/node")?;
            let image_url = image.get("url")?.as_str()?.to_string();
            Some(CandidateImage {
                product_id: node.get("id")?.as_str()?.to_string(),
                title: node
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                handle: node
                    .get("handle")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                image_id: image
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                image_url,
                alt_text: image
                    .get("altText")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            })
        })
        .collect()
}
