//! HTML helpers for the login flow
//!
//! `scraper::Html` is not `Send`, so documents are parsed and dropped inside
//! these synchronous functions and never held across an `.await`.

use scraper::{Html, Selector};

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Values of the named `<input>` elements, in the order requested
///
/// Returns the names that could not be found when any is missing.
pub fn hidden_inputs(
    html: &str,
    names: &[&str],
) -> std::result::Result<Vec<(String, String)>, Vec<String>> {
    let document = Html::parse_document(html);
    let Some(inputs) = selector("input[name]") else {
        return Err(names.iter().map(|n| n.to_string()).collect());
    };

    let mut found = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    for name in names {
        let value = document
            .select(&inputs)
            .find(|el| el.value().attr("name") == Some(*name))
            .and_then(|el| el.value().attr("value"));
        match value {
            Some(v) => found.push((name.to_string(), v.to_string())),
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(found)
    } else {
        Err(missing)
    }
}

/// Whether a page is a login form rather than data or a redirect stub
pub fn looks_like_login_page(html: &str) -> bool {
    let document = Html::parse_document(html);
    ["input[type=password]", "input[name=sessionDataKey]", "form[action*=commonauth]"]
        .iter()
        .filter_map(|css| selector(css))
        .any(|sel| document.select(&sel).next().is_some())
}

/// Text of the `<title>` element, trimmed
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title = selector("title")?;
    document
        .select(&title)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALLBACK_FORM: &str = r#"
        <html><body onload="document.forms[0].submit()">
          <form method="post" action="https://www.solarweb.com/Account/ExternalLoginCallback">
            <input type="hidden" name="code" value="abc" />
            <input type="hidden" name="id_token" value="tok" />
            <input type="hidden" name="state" value="st" />
          </form>
        </body></html>"#;

    const LOGIN_FORM: &str = r#"
        <html><head><title> Fronius Login </title></head><body>
          <form action="../commonauth" method="post">
            <input name="username" type="text" />
            <input name="password" type="password" />
            <input name="sessionDataKey" type="hidden" value="k" />
          </form>
        </body></html>"#;

    #[test]
    fn extracts_requested_inputs_in_order() {
        let fields = hidden_inputs(CALLBACK_FORM, &["state", "code"]).unwrap();
        assert_eq!(
            fields,
            vec![
                ("state".to_string(), "st".to_string()),
                ("code".to_string(), "abc".to_string())
            ]
        );
    }

    #[test]
    fn reports_missing_inputs() {
        let missing = hidden_inputs(CALLBACK_FORM, &["code", "session_state"]).unwrap_err();
        assert_eq!(missing, vec!["session_state".to_string()]);
    }

    #[test]
    fn detects_login_pages() {
        assert!(looks_like_login_page(LOGIN_FORM));
        assert!(!looks_like_login_page(CALLBACK_FORM));
        assert!(!looks_like_login_page("<html><body>ok</body></html>"));
    }

    #[test]
    fn reads_title() {
        assert_eq!(page_title(LOGIN_FORM).as_deref(), Some("Fronius Login"));
        assert_eq!(page_title(CALLBACK_FORM), None);
    }
}
