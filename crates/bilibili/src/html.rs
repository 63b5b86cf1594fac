use scraper::Html;

/// Text content of a search highlight such as `<em class="keyword">x</em>`.
/// Named and numeric character references are decoded.
pub fn inner_text(html: &str) -> String {
    if !html.contains(['<', '&']) {
        return html.to_string();
    }
    Html::parse_fragment(html).root_element().text().collect()
}
