/// Pure URL builders for the avatar service's image endpoints.
///
/// No I/O happens here; everything is string assembly over `AvatarState`.
use crate::state::avatar::{AvatarState, Category};

/// Base of the composed-image preview endpoints. Each category has its own
/// path segment; the whole avatar renders under `/body`.
const PREVIEW_BASE: &str = "https://preview.bitmoji.com/bm-preview/v3/avatar";

/// Versioned post-save renders live on a different host, keyed by the
/// advanced avatar identifier.
const SAVED_IMAGE_BASE: &str = "https://images.bitmoji.com/3d/avatar";

/// Render prefix the service expects in front of the avatar identifier.
const SAVED_IMAGE_PREFIX: &str = "30817224";

/// Scale for the full-avatar preview pane.
const PREVIEW_SCALE: &str = "2";

/// Scale for single-accessory thumbnails.
const THUMBNAIL_SCALE: &str = "0.75";

/// Full-avatar preview: `/body` plus the avatar's ordered request params.
pub fn preview_url(avatar: &AvatarState) -> String {
    format!(
        "{}/body?{}",
        PREVIEW_BASE,
        query_string(&avatar.request_params(PREVIEW_SCALE))
    )
}

/// Single-accessory thumbnail: the category's own path segment, thumbnail
/// scale, the avatar's gender/style, and the candidate identifier. No
/// rotation or version params on this endpoint.
pub fn thumbnail_url(category: Category, identifier: &str, avatar: &AvatarState) -> String {
    let params = [
        ("scale", THUMBNAIL_SCALE.to_string()),
        ("gender", avatar.gender.to_string()),
        ("style", avatar.style.to_string()),
        (category.request_key(), identifier.to_string()),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}/{}?{}", PREVIEW_BASE, category.request_key(), query)
}

/// Post-save confirmation image, addressed by the advanced identifier.
pub fn saved_avatar_url(avatar_id: &str) -> String {
    format!(
        "{}/{}-{}-v1.webp?ua=2",
        SAVED_IMAGE_BASE, SAVED_IMAGE_PREFIX, avatar_id
    )
}

fn query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::avatar::AvatarState;
    use serde_json::json;

    fn avatar() -> AvatarState {
        AvatarState::from_remote(&json!({
            "gender": 2,
            "style": 5,
            "option_ids": { "hat": -1, "top": 321 },
            "id": "u_1-s0",
        }))
        .unwrap()
    }

    #[test]
    fn test_preview_url_has_fixed_params_then_selections() {
        let url = preview_url(&avatar());
        assert_eq!(
            url,
            "https://preview.bitmoji.com/bm-preview/v3/avatar/body\
             ?scale=2&gender=2&style=5&rotation=0&version=0&top=321"
        );
    }

    #[test]
    fn test_preview_url_omits_unset_slots() {
        let url = preview_url(&avatar());
        assert!(!url.contains("hat="));
    }

    #[test]
    fn test_thumbnail_url_uses_singular_key() {
        let url = thumbnail_url(Category::Hats, "99", &avatar());
        assert_eq!(
            url,
            "https://preview.bitmoji.com/bm-preview/v3/avatar/hat\
             ?scale=0.75&gender=2&style=5&hat=99"
        );
        assert!(!url.contains("rotation"));
        assert!(!url.contains("version"));
    }

    #[test]
    fn test_saved_avatar_url_embeds_identifier() {
        assert_eq!(
            saved_avatar_url("u_2-s0"),
            "https://images.bitmoji.com/3d/avatar/30817224-u_2-s0-v1.webp?ua=2"
        );
    }
}
