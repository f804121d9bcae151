use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::entities::{Photo, SearchResult};

/// Shutterstock studio search response.
#[derive(Debug, Deserialize)]
pub struct ShutterstockResponse {
    #[serde(default)]
    pub data: Vec<ShutterstockImage>,
    pub meta: ShutterstockMeta,
}

#[derive(Debug, Deserialize)]
pub struct ShutterstockImage {
    pub attributes: ShutterstockAttributes,
}

#[derive(Debug, Deserialize)]
pub struct ShutterstockAttributes {
    pub displays: ShutterstockDisplays,
    /// Accessibility description.
    #[serde(default)]
    pub alt: Option<String>,
}

/// Rendition table keyed by Shutterstock's size names.
#[derive(Debug, Deserialize)]
pub struct ShutterstockDisplays {
    /// 260px-wide preview.
    #[serde(rename = "260nw", default)]
    pub thumbnail: Option<ShutterstockDisplay>,
    /// 1500px-wide watermarked full image.
    #[serde(rename = "1500w", default)]
    pub full: Option<ShutterstockDisplay>,
}

#[derive(Debug, Deserialize)]
pub struct ShutterstockDisplay {
    pub src: String,
}

#[derive(Debug, Deserialize)]
pub struct ShutterstockMeta {
    pub pagination: ShutterstockPagination,
}

#[derive(Debug, Deserialize)]
pub struct ShutterstockPagination {
    pub page_number: u32,
    pub total_pages: u32,
}

impl ShutterstockPagination {
    /// Page number to request next, while pages remain.
    #[must_use]
    pub fn next_token(&self) -> Option<String> {
        (self.page_number < self.total_pages).then(|| (self.page_number + 1).to_string())
    }
}

impl From<ShutterstockResponse> for SearchResult {
    fn from(response: ShutterstockResponse) -> Self {
        let token = response.meta.pagination.next_token();
        let photos = response
            .data
            .into_iter()
            .filter_map(|image| {
                let attributes = image.attributes;
                let full = attributes.displays.full?;
                let mut photo = Photo::new(full.src);
                photo.thumbnail_url = attributes.displays.thumbnail.map(|d| d.src);
                photo.alt_text = attributes.alt;
                Some(photo)
            })
            .collect();
        Self::new(photos, token)
    }
}

/// Bigstock search response, served as JSON to XHR requests.
#[derive(Debug, Deserialize)]
pub struct BigstockResponse {
    #[serde(rename = "results", default)]
    pub images: Vec<BigstockImage>,
    /// Offset of the next page, absent on the last page.
    #[serde(default)]
    pub next_start: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct BigstockImage {
    pub url: String,
    #[serde(default)]
    pub display_title: Option<String>,
}

impl From<BigstockResponse> for SearchResult {
    fn from(response: BigstockResponse) -> Self {
        let photos = response
            .images
            .into_iter()
            .map(|image| {
                let mut photo = Photo::new(image.url);
                photo.alt_text = image.display_title;
                photo
            })
            .collect();
        Self::new(photos, response.next_start.map(|start| start.to_string()))
    }
}

/// iStock search response. The page size is fixed by the site.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IStockResponse {
    #[serde(default)]
    pub assets: Vec<IStockAsset>,
    pub page: u32,
    pub last_page: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IStockAsset {
    pub thumb_url: String,
    /// Watermarked preview. Its query string selects a smaller rendition.
    pub preview_url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

impl IStockResponse {
    #[must_use]
    pub fn next_token(&self) -> Option<String> {
        (self.page < self.last_page).then(|| (self.page + 1).to_string())
    }
}

impl From<IStockAsset> for Photo {
    fn from(asset: IStockAsset) -> Self {
        let full = asset
            .preview_url
            .split_once('?')
            .map_or(asset.preview_url.as_str(), |(base, _)| base)
            .to_string();
        let mut photo = Photo::new(full).with_thumbnail(asset.thumb_url);
        photo.alt_text = asset.caption;
        photo
    }
}

impl From<IStockResponse> for SearchResult {
    fn from(response: IStockResponse) -> Self {
        let token = response.next_token();
        Self::new(response.assets.into_iter().map(Photo::from).collect(), token)
    }
}

/// Adobe Stock site search response.
#[derive(Debug, Deserialize)]
pub struct AdobeResponse {
    #[serde(default)]
    pub items: AdobeItems,
    pub search_page: u32,
    pub num_pages: u32,
}

/// Results keyed by content id. An empty result set arrives as `[]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AdobeItems {
    Keyed(BTreeMap<String, AdobeItem>),
    Empty(Vec<AdobeItem>),
}

impl Default for AdobeItems {
    fn default() -> Self {
        Self::Keyed(BTreeMap::new())
    }
}

impl AdobeItems {
    fn into_vec(self) -> Vec<AdobeItem> {
        match self {
            Self::Keyed(items) => items.into_values().collect(),
            Self::Empty(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdobeItem {
    pub thumbnail_url: String,
    pub content_thumb_large_url: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl AdobeResponse {
    #[must_use]
    pub fn next_token(&self) -> Option<String> {
        (self.search_page < self.num_pages).then(|| (self.search_page + 1).to_string())
    }
}

impl From<AdobeResponse> for SearchResult {
    fn from(response: AdobeResponse) -> Self {
        let token = response.next_token();
        let photos = response
            .items
            .into_vec()
            .into_iter()
            .map(|item| {
                let mut photo =
                    Photo::new(item.content_thumb_large_url).with_thumbnail(item.thumbnail_url);
                photo.alt_text = item.title;
                photo
            })
            .collect();
        Self::new(photos, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const SHUTTERSTOCK_PAGE: &str = r#"{
        "data": [
            {
                "id": "1",
                "attributes": {
                    "alt": "Tabby cat on a windowsill",
                    "displays": {
                        "260nw": {"src": "https://image.shutterstock.com/tabby-260nw.jpg", "width": 260, "height": 173},
                        "1500w": {"src": "https://image.shutterstock.com/tabby-1500w.jpg", "width": 1500, "height": 1000}
                    }
                }
            },
            {
                "id": "2",
                "attributes": {
                    "displays": {
                        "260nw": {"src": "https://image.shutterstock.com/no-full-260nw.jpg", "width": 260, "height": 173}
                    }
                }
            },
            {
                "id": "3",
                "attributes": {
                    "displays": {
                        "1500w": {"src": "https://image.shutterstock.com/kitten-1500w.jpg", "width": 1500, "height": 1000}
                    }
                }
            }
        ],
        "meta": {"pagination": {"page_number": 1, "total_pages": 40}}
    }"#;

    #[test]
    fn test_shutterstock_page_maps_to_photos() {
        let response: ShutterstockResponse = serde_json::from_str(SHUTTERSTOCK_PAGE).unwrap();
        let result = SearchResult::from(response);

        assert_eq!(result.photos.len(), 2);
        assert_eq!(
            result.photos[0],
            Photo::new("https://image.shutterstock.com/tabby-1500w.jpg")
                .with_thumbnail("https://image.shutterstock.com/tabby-260nw.jpg")
                .with_alt_text("Tabby cat on a windowsill")
        );
        assert_eq!(result.photos[1].thumbnail_url, None);
        assert_eq!(result.photos[1].alt_text, None);
        assert_eq!(result.continuation_token.as_deref(), Some("2"));
    }

    #[test_case(1, 40, Some("2") ; "more_pages")]
    #[test_case(39, 40, Some("40") ; "second_to_last")]
    #[test_case(40, 40, None ; "last_page")]
    #[test_case(1, 0, None ; "no_results")]
    fn test_shutterstock_next_token(page_number: u32, total_pages: u32, expected: Option<&str>) {
        let pagination = ShutterstockPagination {
            page_number,
            total_pages,
        };
        assert_eq!(pagination.next_token().as_deref(), expected);
    }

    #[test]
    fn test_shutterstock_missing_meta_is_an_error() {
        assert!(serde_json::from_str::<ShutterstockResponse>(r#"{"data": []}"#).is_err());
    }

    #[test]
    fn test_bigstock_page_maps_to_photos() {
        let json = r#"{
            "results": [
                {"url": "https://static.bigstockphoto.com/cat.jpg", "display_title": "Cat"},
                {"url": "https://static.bigstockphoto.com/dog.jpg"}
            ],
            "next_start": 24
        }"#;
        let result = SearchResult::from(serde_json::from_str::<BigstockResponse>(json).unwrap());

        assert_eq!(result.photos.len(), 2);
        assert_eq!(result.photos[0].alt_text.as_deref(), Some("Cat"));
        assert!(result.photos.iter().all(|p| p.thumbnail_url.is_none()));
        assert_eq!(result.continuation_token.as_deref(), Some("24"));
    }

    #[test]
    fn test_bigstock_last_page_has_no_token() {
        let result =
            SearchResult::from(serde_json::from_str::<BigstockResponse>(r#"{"results": []}"#).unwrap());
        assert!(result.photos.is_empty());
        assert!(!result.has_more());
    }

    const ISTOCK_PAGE: &str = r#"{
        "assets": [
            {
                "id": 1,
                "thumbUrl": "https://media.istockphoto.com/id/1/photo/owl.jpg?s=170667a",
                "previewUrl": "https://media.istockphoto.com/id/1/photo/owl.jpg?s=612x612&w=0",
                "caption": "Barn owl at dusk"
            },
            {
                "id": 2,
                "thumbUrl": "https://media.istockphoto.com/id/2/photo/fox.jpg?s=170667a",
                "previewUrl": "https://media.istockphoto.com/id/2/photo/fox.jpg"
            }
        ],
        "page": 2,
        "lastPage": 9
    }"#;

    #[test]
    fn test_istock_page_maps_to_photos() {
        let result = SearchResult::from(serde_json::from_str::<IStockResponse>(ISTOCK_PAGE).unwrap());

        assert_eq!(
            result.photos,
            vec![
                Photo::new("https://media.istockphoto.com/id/1/photo/owl.jpg")
                    .with_thumbnail("https://media.istockphoto.com/id/1/photo/owl.jpg?s=170667a")
                    .with_alt_text("Barn owl at dusk"),
                Photo::new("https://media.istockphoto.com/id/2/photo/fox.jpg")
                    .with_thumbnail("https://media.istockphoto.com/id/2/photo/fox.jpg?s=170667a"),
            ]
        );
        assert_eq!(result.continuation_token.as_deref(), Some("3"));
    }

    #[test_case(1, 9, Some("2") ; "more_pages")]
    #[test_case(9, 9, None ; "last_page")]
    #[test_case(1, 0, None ; "no_results")]
    fn test_istock_next_token(page: u32, last_page: u32, expected: Option<&str>) {
        let response = IStockResponse {
            assets: Vec::new(),
            page,
            last_page,
        };
        assert_eq!(response.next_token().as_deref(), expected);
    }

    #[test]
    fn test_adobe_page_maps_to_photos_in_key_order() {
        let json = r#"{
            "items": {
                "202": {
                    "thumbnail_url": "https://t4.ftcdn.net/jpg/02/02/240_F_202.jpg",
                    "content_thumb_large_url": "https://t4.ftcdn.net/jpg/02/02/500_F_202.jpg"
                },
                "101": {
                    "thumbnail_url": "https://t4.ftcdn.net/jpg/01/01/240_F_101.jpg",
                    "content_thumb_large_url": "https://t4.ftcdn.net/jpg/01/01/500_F_101.jpg",
                    "title": "Mountain lake"
                }
            },
            "search_page": 1,
            "num_pages": 3
        }"#;
        let result = SearchResult::from(serde_json::from_str::<AdobeResponse>(json).unwrap());

        assert_eq!(
            result.photos,
            vec![
                Photo::new("https://t4.ftcdn.net/jpg/01/01/500_F_101.jpg")
                    .with_thumbnail("https://t4.ftcdn.net/jpg/01/01/240_F_101.jpg")
                    .with_alt_text("Mountain lake"),
                Photo::new("https://t4.ftcdn.net/jpg/02/02/500_F_202.jpg")
                    .with_thumbnail("https://t4.ftcdn.net/jpg/02/02/240_F_202.jpg"),
            ]
        );
        assert_eq!(result.continuation_token.as_deref(), Some("2"));
    }

    #[test]
    fn test_adobe_empty_items_array() {
        let json = r#"{"items": [], "search_page": 1, "num_pages": 0}"#;
        let result = SearchResult::from(serde_json::from_str::<AdobeResponse>(json).unwrap());
        assert!(result.photos.is_empty());
        assert!(!result.has_more());
    }
}
