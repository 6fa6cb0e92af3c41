use serde::{Deserialize, Serialize};

/// A catalog image proposed for ingestion, before dedup and embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateImage {
    pub product_id: String,
    pub title: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub image_id: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

/// An image persisted in the primary store, one row per distinct source URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub shop: String,
    pub product_id: String,
    pub label: String,
    #[serde(default)]
    pub handle: String,
    pub source_url: String,
    /// Dense embedding (may be empty when the provider produced no output).
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A record projected into the secondary ANN index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: IndexMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub shop: String,
    pub product_id: String,
    pub title: String,
    pub image_url: String,
    pub product_url: String,
}

impl ImageRecord {
    /// Project into the shape the secondary index stores.
    pub fn to_index_entry(&self) -> IndexEntry {
        IndexEntry {
            id: self.id.clone(),
            values: self.embedding.clone(),
            metadata: IndexMetadata {
                shop: self.shop.clone(),
                product_id: self.product_id.clone(),
                title: self.label.clone(),
                image_url: self.source_url.clone(),
                product_url: product_url(&self.shop, &self.handle),
            },
        }
    }
}

/// Storefront URL for a product handle.
pub fn product_url(shop: &str, handle: &str) -> String {
    if handle.is_empty() {
        format!("https://{shop}")
    } else {
        format!("https://{shop}/products/{handle}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ImageRecord {
        ImageRecord {
            id: "rec-1".to_string(),
            shop: "demo.myshopify.com".to_string(),
            product_id: "gid://shopify/Product/1".to_string(),
            label: "Blue shirt".to_string(),
            handle: "blue-shirt".to_string(),
            source_url: "https://cdn.example.com/blue.jpg".to_string(),
            embedding: vec![0.1, 0.2, 0.3],
            created_at: None,
        }
    }

    #[test]
    fn test_to_index_entry() {
        let entry = record().to_index_entry();
        assert_eq!(entry.id, "rec-1");
        assert_eq!(entry.values.len(), 3);
        assert_eq!(entry.metadata.title, "Blue shirt");
        assert_eq!(entry.metadata.image_url, "https://cdn.example.com/blue.jpg");
        assert_eq!(
            entry.metadata.product_url,
            "https://demo.myshopify.com/products/blue-shirt"
        );
    }

    #[test]
    fn test_product_url_without_handle() {
        assert_eq!(
            product_url("demo.myshopify.com", ""),
            "https://demo.myshopify.com"
        );
    }

    #[test]
    fn test_image_record_roundtrip() {
        let json = serde_json::to_string(&record()).unwrap();
        let back: ImageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source_url, "https://cdn.example.com/blue.jpg");
        assert_eq!(back.embedding, vec![0.1, 0.2, 0.3]);
    }
}
