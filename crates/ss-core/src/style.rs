//! Cosmetic stylesheet for non-interactive ad decoration.
//!
//! Hides display ads, promo banners, and image/text overlays that the agent
//! never needs to interact with. Strictly cosmetic: the media element,
//! skip controls, and the indicator elements the observer reads must stay
//! visible, or the heuristics would blind themselves.

/// CSS injected once per page load by the host.
pub const COSMETIC_CSS: &str = "\
ytd-display-ad-renderer,
ytd-promoted-sparkles-web-renderer,
ytd-banner-promo-renderer,
.ytp-ad-image-overlay,
.ytp-ad-text-overlay {
    display: none !important;
}
";
