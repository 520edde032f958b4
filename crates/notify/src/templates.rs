//! HTML email templates.
//!
//! Every message is built from one skeleton (branded header, content block,
//! footer) so the template methods stay pure string builders parameterized
//! by the call site.

/// Brand palette.
const BRAND_PRIMARY: &str = "#1f6feb";
const BRAND_DARK: &str = "#0d2340";
const BRAND_BG: &str = "#f5f7fa";
const BRAND_TEXT: &str = "#24292f";

/// Wrap a content block in the shared skeleton.
pub fn skeleton(title: &str, content_html: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html><body style=\"margin:0;padding:0;background:{bg};font-family:Helvetica,Arial,sans-serif;color:{text};\">\n",
            "<table role=\"presentation\" width=\"100%\" cellpadding=\"0\" cellspacing=\"0\"><tr><td align=\"center\" style=\"padding:24px;\">\n",
            "<table role=\"presentation\" width=\"600\" cellpadding=\"0\" cellspacing=\"0\" style=\"background:#ffffff;border-radius:8px;overflow:hidden;\">\n",
            "<tr><td style=\"background:{dark};padding:20px 32px;\">\n",
            "<span style=\"color:#ffffff;font-size:18px;font-weight:bold;\">MediaPlan Hub</span>\n",
            "</td></tr>\n",
            "<tr><td style=\"padding:32px;\">\n",
            "<h1 style=\"font-size:20px;margin:0 0 16px;color:{dark};\">{title}</h1>\n",
            "{content}\n",
            "</td></tr>\n",
            "<tr><td style=\"background:{bg};padding:16px 32px;font-size:12px;color:#6e7781;\">\n",
            "You are receiving this because you have notifications enabled for your hub.\n",
            "</td></tr>\n",
            "</table></td></tr></table>\n",
            "</body></html>"
        ),
        bg = BRAND_BG,
        dark = BRAND_DARK,
        text = BRAND_TEXT,
        title = title,
        content = content_html,
    )
}

fn button(label: &str, href: &str) -> String {
    format!(
        "<a href=\"{href}\" style=\"display:inline-block;background:{BRAND_PRIMARY};color:#ffffff;\
         padding:10px 20px;border-radius:6px;text-decoration:none;font-weight:bold;\">{label}</a>"
    )
}

/// "New creative assets uploaded" notification.
pub fn assets_uploaded(uploader_name: &str, file_name: &str, campaign_link: &str) -> String {
    let content = format!(
        "<p><strong>{uploader_name}</strong> uploaded a new creative asset:</p>\
         <p style=\"background:{BRAND_BG};padding:12px;border-radius:6px;\
         font-family:monospace;\">{file_name}</p>\
         <p>Review it in the campaign workspace.</p>\
         <p>{button}</p>",
        button = button("View campaign", campaign_link),
    );
    skeleton("New creative asset uploaded", &content)
}

/// "All assets are ready" notification for an order.
pub fn assets_ready(publication_name: &str, order_link: &str) -> String {
    let content = format!(
        "<p>Every placement on your insertion order with \
         <strong>{publication_name}</strong> now has a creative asset.</p>\
         <p>{button}</p>",
        button = button("Open order", order_link),
    );
    skeleton("Creative assets ready", &content)
}

/// Asset status change notification.
pub fn status_changed(file_name: &str, status: &str, asset_link: &str) -> String {
    let content = format!(
        "<p>The creative asset <strong>{file_name}</strong> was \
         <strong>{status}</strong>.</p>\
         <p>{button}</p>",
        button = button("View asset", asset_link),
    );
    skeleton("Creative asset status updated", &content)
}

/// Click URL change notification.
pub fn click_url_changed(file_name: &str, click_url: &str, campaign_link: &str) -> String {
    let content = format!(
        "<p>The click-through URL on <strong>{file_name}</strong> changed to:</p>\
         <p style=\"background:{BRAND_BG};padding:12px;border-radius:6px;\
         font-family:monospace;word-break:break-all;\">{click_url}</p>\
         <p>Tracking scripts for affected placements were regenerated.</p>\
         <p>{button}</p>",
        button = button("View campaign", campaign_link),
    );
    skeleton("Click URL updated", &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_wraps_content() {
        let html = skeleton("Hello", "<p>Body</p>");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("MediaPlan Hub"));
        assert!(html.contains("<p>Body</p>"));
        assert!(html.contains(BRAND_DARK));
    }

    #[test]
    fn templates_embed_their_parameters() {
        let html = assets_uploaded("Dana", "banner.png", "https://app/c/1");
        assert!(html.contains("Dana"));
        assert!(html.contains("banner.png"));
        assert!(html.contains("https://app/c/1"));

        let html = status_changed("banner.png", "approved", "https://app/a/1");
        assert!(html.contains("approved"));
    }
}
