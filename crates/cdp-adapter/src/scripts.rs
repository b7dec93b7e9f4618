//! Page-side scripts.
//!
//! Every script is a self-invoking expression that returns a small status
//! object by value. Arguments are embedded as JSON literals.

use action_primitives::AnchorDescriptor;
use serde_json::{json, Value};

pub(crate) const REF_ATTR: &str = "data-slotwatch-ref";
pub(crate) const FIELD_ATTR: &str = "data-slotwatch-field";

const HELPERS: &str = r#"
    const norm = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
    const visible = (el) => {
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none';
    };
    const roleOf = (el) => {
        const explicit = el.getAttribute('role');
        if (explicit) { return explicit.toLowerCase(); }
        const tag = el.tagName.toLowerCase();
        const type = (el.getAttribute('type') || '').toLowerCase();
        if (tag === 'button') { return 'button'; }
        if (tag === 'input' && ['button', 'submit', 'reset'].includes(type)) { return 'button'; }
        if (tag === 'a' && el.hasAttribute('href')) { return 'link'; }
        if (tag === 'select') { return 'combobox'; }
        if (tag === 'textarea' || tag === 'input') { return 'textbox'; }
        return '';
    };
    const nameOf = (el) => norm(
        el.getAttribute('aria-label') || el.innerText || el.textContent
            || el.value || el.getAttribute('title') || ''
    );
"#;

/// Find the first visible element for `anchor` and tag it with `token`.
///
/// Returns `{status: 'found', selector}`, `{status: 'not-found'}` or
/// `{status: 'invalid', detail}` for a selector the page rejects.
pub(crate) fn locate(anchor: &AnchorDescriptor, token: &str) -> String {
    let query = match anchor {
        AnchorDescriptor::Css(selector) => json!({ "kind": "css", "selector": selector }),
        AnchorDescriptor::Aria { role, name } => {
            json!({ "kind": "role", "role": role.to_lowercase(), "name": name })
        }
        AnchorDescriptor::Text { content, exact } => {
            json!({ "kind": "text", "name": content, "exact": exact })
        }
    };

    format!(
        r#"(() => {{
    {helpers}
    const query = {query};
    const attr = {attr};
    const token = {token};
    let candidates = [];
    if (query.kind === 'css') {{
        try {{
            candidates = Array.from(document.querySelectorAll(query.selector));
        }} catch (err) {{
            return {{ status: 'invalid', detail: String(err) }};
        }}
    }} else if (query.kind === 'role') {{
        const needle = norm(query.name);
        candidates = Array.from(document.querySelectorAll('button,a,input,select,textarea,[role]'))
            .filter((el) => roleOf(el) === query.role && nameOf(el).includes(needle));
    }} else {{
        const needle = norm(query.name);
        const matches = Array.from(document.querySelectorAll('body *')).filter((el) => {{
            const text = norm(el.innerText || el.textContent);
            return query.exact ? text === needle : text.includes(needle);
        }});
        candidates = matches.filter((el) => !Array.from(el.children).some((child) => matches.includes(child)));
    }}
    const hit = candidates.find(visible);
    if (!hit) {{ return {{ status: 'not-found' }}; }}
    hit.setAttribute(attr, token);
    return {{ status: 'found', selector: `[${{attr}}="${{token}}"]` }};
}})()"#,
        helpers = HELPERS,
        query = query,
        attr = json!(REF_ATTR),
        token = json!(token),
    )
}

/// All inputs, selects and textareas in document order, each tagged with its
/// index so it can be addressed again.
pub(crate) fn form_fields() -> String {
    format!(
        r#"(() => {{
    const attr = {attr};
    const text = (s) => (s || '').replace(/\s+/g, ' ').trim();
    return Array.from(document.querySelectorAll('input,select,textarea')).map((el, index) => {{
        el.setAttribute(attr, String(index));
        const label = (el.labels && el.labels.length) ? el.labels[0].innerText
            : (el.closest('label') ? el.closest('label').innerText : '');
        return {{
            index,
            tag: el.tagName.toLowerCase(),
            name: el.getAttribute('name') || '',
            id: el.id || '',
            placeholder: el.getAttribute('placeholder') || '',
            aria_label: el.getAttribute('aria-label') || '',
            label: text(label),
            selector: `[${{attr}}="${{index}}"]`,
        }};
    }});
}})()"#,
        attr = json!(FIELD_ATTR),
    )
}

/// Replace the element's value and fire `input`/`change`.
pub(crate) fn fill(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) {{ return {{ status: 'not-found' }}; }}
    if (typeof el.focus === 'function') {{ el.focus(); }}
    const proto = el instanceof HTMLTextAreaElement
        ? HTMLTextAreaElement.prototype
        : HTMLInputElement.prototype;
    const descriptor = Object.getOwnPropertyDescriptor(proto, 'value');
    if (descriptor && descriptor.set && el instanceof proto.constructor) {{
        descriptor.set.call(el, {value});
    }} else {{
        el.value = {value};
    }}
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return {{ status: 'filled' }};
}})()"#,
        selector = json!(selector),
        value = json!(value),
    )
}

/// Choose an option by visible label (exact, then partial), falling back to
/// the option value.
pub(crate) fn select(selector: &str, label: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) {{ return {{ status: 'not-found' }}; }}
    const norm = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
    const wanted = norm({label});
    const options = Array.from(el.options || []);
    const option = options.find((opt) => norm(opt.text) === wanted)
        || options.find((opt) => norm(opt.text).includes(wanted))
        || options.find((opt) => norm(opt.value) === wanted);
    if (!option) {{ return {{ status: 'option-missing' }}; }}
    el.value = option.value;
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return {{ status: 'selected', value: el.value }};
}})()"#,
        selector = json!(selector),
        label = json!(label),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScriptStatus {
    Found(String),
    Done,
    NotFound,
    OptionMissing,
    Invalid(String),
}

pub(crate) fn parse_status(value: &Value) -> ScriptStatus {
    let status = value.get("status").and_then(Value::as_str).unwrap_or("unknown");
    match status {
        "found" => match value.get("selector").and_then(Value::as_str) {
            Some(selector) => ScriptStatus::Found(selector.to_string()),
            None => ScriptStatus::Invalid("found without selector".into()),
        },
        "filled" | "selected" => ScriptStatus::Done,
        "not-found" => ScriptStatus::NotFound,
        "option-missing" => ScriptStatus::OptionMissing,
        "invalid" => ScriptStatus::Invalid(
            value
                .get("detail")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        other => ScriptStatus::Invalid(format!("unexpected status {other}")),
    }
}
