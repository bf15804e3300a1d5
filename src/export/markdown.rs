use crate::finder::Company;

/// Text for one table cell: pipes escaped and line breaks flattened. Inside
/// a link, brackets and parentheses are escaped too so the link stays intact.
fn cell(s: &str, in_link: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '|' => out.push_str("\\|"),
            '\n' | '\r' => out.push(' '),
            '[' | ']' | '(' | ')' if in_link => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn companies_table(title: &str, summary: &str, companies: &[Company]) -> String {
    let heading = title.replace(['\n', '\r'], " ");
    let mut output = format!("# {heading}\n\n{summary}\n\n");
    if companies.is_empty() {
        output.push_str("_No companies found._\n");
        return output;
    }

    output.push_str("| Company | Country | Industry | Size | Founded |\n");
    output.push_str("|---|---|---|---|---|\n");
    for company in companies {
        let name = if company.url.is_empty() {
            cell(&company.name, false)
        } else {
            format!("[{}]({})", cell(&company.name, true), cell(&company.url, true))
        };
        output.push_str(&format!(
            "| {name} | {} | {} | {} | {} |\n",
            cell(&company.country, false),
            cell(&company.industry, false),
            cell(&company.size, false),
            cell(&company.founded, false),
        ));
    }
    output
}
