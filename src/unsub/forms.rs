//! Form extraction from fetched confirmation pages.

use super::scanner::{HtmlEvent, HtmlScanner};
use super::vocab;

/// One HTML form: where it submits, how, and with what default fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDescriptor {
    /// Action URL. May be empty or `#`, meaning "resubmit to the same page".
    pub action: String,
    /// HTTP method, uppercased. Defaults to `GET` when unspecified.
    pub method: String,
    /// Named input fields in document order; a repeated name overwrites the
    /// earlier value (last occurrence wins). Unnamed inputs are dropped.
    pub inputs: Vec<(String, String)>,
    /// Accumulated visible text of the form subtree.
    pub text: String,
}

impl FormDescriptor {
    /// True when this form looks like an unsubscribe confirmation step:
    /// its text plus input values match the intent vocabulary, or contain
    /// a bare "confirm".
    pub fn looks_like_confirmation(&self) -> bool {
        let mut haystack = self.text.to_lowercase();
        haystack.push(' ');
        for (_, value) in &self.inputs {
            haystack.push_str(&value.to_lowercase());
            haystack.push(' ');
        }
        vocab::matches_intent(&haystack) || haystack.contains("confirm")
    }
}

/// Extract all forms from raw HTML, in document order.
///
/// Nested `<form>` tags are not supported (single-level state machine): a
/// `<form>` inside a form restarts capture, matching the link extractor's
/// nested-anchor behavior.
pub fn extract_forms(html: &str) -> Vec<FormDescriptor> {
    let mut forms = Vec::new();
    let mut current: Option<FormDescriptor> = None;
    let mut current_text: Vec<String> = Vec::new();

    for event in HtmlScanner::new(html) {
        match event {
            HtmlEvent::Start(tag) => match tag.name.as_str() {
                "form" => {
                    current = Some(FormDescriptor {
                        action: tag.attr("action").unwrap_or("").to_string(),
                        method: tag
                            .attr("method")
                            .unwrap_or("GET")
                            .to_ascii_uppercase(),
                        inputs: Vec::new(),
                        text: String::new(),
                    });
                    current_text.clear();
                }
                "input" => {
                    if let Some(ref mut form) = current {
                        if let Some(name) = tag.attr("name") {
                            if !name.is_empty() {
                                let value = tag.attr("value").unwrap_or("").to_string();
                                match form.inputs.iter_mut().find(|(n, _)| n.as_str() == name) {
                                    Some(slot) => slot.1 = value,
                                    None => form.inputs.push((name.to_string(), value)),
                                }
                            }
                        }
                    }
                }
                _ => {}
            },
            HtmlEvent::Text(data) => {
                if current.is_some() {
                    current_text.push(data.into_owned());
                }
            }
            HtmlEvent::End(name) if name == "form" => {
                if let Some(mut form) = current.take() {
                    form.text = current_text.join(" ").trim().to_string();
                    forms.push(form);
                    current_text.clear();
                }
            }
            HtmlEvent::End(_) => {}
        }
    }
    forms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_form() {
        let html = r#"<form action="/confirm" method="POST">
            Click confirm to finish
            <input name="token" value="abc">
        </form>"#;
        let forms = extract_forms(html);
        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form.action, "/confirm");
        assert_eq!(form.method, "POST");
        assert_eq!(form.inputs, vec![("token".to_string(), "abc".to_string())]);
        assert!(form.text.contains("Click confirm to finish"));
    }

    #[test]
    fn test_method_defaults_to_get() {
        let forms = extract_forms(r#"<form action="/go"></form>"#);
        assert_eq!(forms[0].method, "GET");
    }

    #[test]
    fn test_method_case_insensitive() {
        let forms = extract_forms(r#"<form method="post"></form>"#);
        assert_eq!(forms[0].method, "POST");
    }

    #[test]
    fn test_empty_action_allowed() {
        let forms = extract_forms("<form><input name=a value=1></form>");
        assert_eq!(forms[0].action, "");
    }

    #[test]
    fn test_unnamed_inputs_dropped() {
        let forms = extract_forms(r#"<form><input value="x"><input name="" value="y"></form>"#);
        assert!(forms[0].inputs.is_empty());
    }

    #[test]
    fn test_repeated_name_last_wins() {
        let forms =
            extract_forms(r#"<form><input name="a" value="1"><input name="a" value="2"></form>"#);
        assert_eq!(forms[0].inputs, vec![("a".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_input_value_defaults_empty() {
        let forms = extract_forms(r#"<form><input name="a"></form>"#);
        assert_eq!(forms[0].inputs, vec![("a".to_string(), String::new())]);
    }

    #[test]
    fn test_inputs_outside_form_ignored() {
        let forms = extract_forms(r#"<input name="stray"><form action="/x"></form>"#);
        assert!(forms[0].inputs.is_empty());
    }

    #[test]
    fn test_multiple_forms_document_order() {
        let html = r#"<form action="/one"></form><form action="/two"></form>"#;
        let forms = extract_forms(html);
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].action, "/one");
        assert_eq!(forms[1].action, "/two");
    }

    #[test]
    fn test_unclosed_form_not_emitted() {
        let forms = extract_forms(r#"<form action="/x"><input name="a">"#);
        assert!(forms.is_empty());
    }

    #[test]
    fn test_confirmation_by_text() {
        let forms = extract_forms(r#"<form>Confirm your unsubscribe request</form>"#);
        assert!(forms[0].looks_like_confirmation());
    }

    #[test]
    fn test_confirmation_by_input_value() {
        let forms =
            extract_forms(r#"<form><input type="submit" name="go" value="Unsubscribe"></form>"#);
        assert!(forms[0].looks_like_confirmation());
    }

    #[test]
    fn test_confirmation_by_bare_confirm() {
        let forms = extract_forms(r#"<form>Please confirm below<input name="t"></form>"#);
        assert!(forms[0].looks_like_confirmation());
    }

    #[test]
    fn test_not_a_confirmation() {
        let forms = extract_forms(r#"<form>Search our site<input name="q"></form>"#);
        assert!(!forms[0].looks_like_confirmation());
    }
}
