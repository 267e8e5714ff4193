//! Text rendering helpers for registration and resolution errors.
//!
//! Rust type names are long (`my_app::repos::GenericRepository<my_app::Customer>`);
//! these helpers turn them and the chains they form into something a person
//! can read in a panic message.

/// Joins a chain of type names with arrows.
///
/// Used for resolution paths and inheritance chains alike.
///
/// # Examples
/// ```
/// use fluentdi_support::rendering::render_chain;
///
/// let chain = ["CustomerRepository", "GenericRepository<Customer>"];
/// assert_eq!(render_chain(&chain), "CustomerRepository → GenericRepository<Customer>");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    let mut rendered = String::new();
    for (i, name) in chain.iter().enumerate() {
        if i > 0 {
            rendered.push_str(" → ");
        }
        rendered.push_str(name.as_ref());
    }
    rendered
}

/// Strips module paths from every path segment of a type name.
///
/// ```
/// use fluentdi_support::rendering::shorten_type_name;
///
/// assert_eq!(
///     shorten_type_name("dyn shop::repos::Repository<shop::model::Customer>"),
///     "dyn Repository<Customer>",
/// );
/// assert_eq!(
///     shorten_type_name("fluentdi_container::delegate::ParameterizedFactory<app::Provider, dyn app::Strategy>"),
///     "ParameterizedFactory<Provider, dyn Strategy>",
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut short = String::with_capacity(full_name.len());
    let mut segment_start = 0;

    for ch in full_name.chars() {
        match ch {
            ':' => {
                // `a::b` drops everything written so far in this segment
                short.truncate(segment_start);
            }
            '<' | '>' | ',' | ' ' | '&' | '(' | ')' | '[' | ']' | ';' | '*' => {
                short.push(ch);
                segment_start = short.len();
            }
            _ => short.push(ch),
        }
    }

    short
}

/// Picks registered names that look like the requested one.
///
/// Names containing each other rank first, then matches on the shortened
/// name, then names sharing a prefix of at least three characters.
/// At most `limit` names are returned, best first.
pub fn suggest_similar(requested: &str, available: &[&str], limit: usize) -> Vec<String> {
    let wanted_full = requested.to_lowercase();
    let wanted_short = shorten_type_name(requested).to_lowercase();

    let mut ranked: Vec<(usize, &str)> = available
        .iter()
        .filter_map(|&candidate| {
            let full = candidate.to_lowercase();
            let short = shorten_type_name(candidate).to_lowercase();

            let score = if full.contains(&wanted_full) || wanted_full.contains(&full) {
                100
            } else if short.contains(&wanted_short) || wanted_short.contains(&short) {
                80
            } else {
                let shared = short
                    .chars()
                    .zip(wanted_short.chars())
                    .take_while(|(a, b)| a == b)
                    .count();
                if shared < 3 {
                    return None;
                }
                (shared * 10).min(79)
            };

            Some((score, candidate))
        })
        .collect();

    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}
