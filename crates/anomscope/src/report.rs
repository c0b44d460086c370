use std::io::Write;

use anomscope_core::{GroupOutcome, SemanticRole};
use anomscope_view::{CATEGORICAL_ROLES, FilterOptions, Kpis, ResolvedSchema, ViewSnapshot};

pub fn write_view(snapshot: &ViewSnapshot, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "cost_metric\t{}", normalize_field(&snapshot.cost_field))?;
    write_kpis(&snapshot.kpis, out)?;
    writeln!(
        out,
        "filtered_rows\t{}\tfocus\t{}\tfocus_rows\t{}\tiqr_rows\t{}\tz_rows\t{}",
        snapshot.filtered_count,
        snapshot.state.focus.as_str(),
        snapshot.focus_count,
        snapshot.iqr_count,
        snapshot.z_count
    )?;
    writeln!(
        out,
        "context_columns\t{}/{}",
        snapshot.quality.context_columns, snapshot.quality.context_columns_total
    )?;
    writeln!(out)?;

    let header: Vec<String> = snapshot
        .table
        .columns
        .iter()
        .map(|column| normalize_field(&column.title))
        .collect();
    writeln!(out, "{}", header.join("\t"))?;
    for row in &snapshot.table.rows {
        let cells: Vec<String> = row.iter().map(|cell| normalize_field(cell)).collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }

    Ok(())
}

pub fn write_kpis(kpis: &Kpis, out: &mut dyn Write) -> std::io::Result<()> {
    let cards = kpis.cards();
    let labels: Vec<&str> = cards.iter().map(|(label, _)| *label).collect();
    let values: Vec<String> = cards.iter().map(|(_, value)| normalize_field(value)).collect();
    writeln!(out, "{}", labels.join("\t"))?;
    writeln!(out, "{}", values.join("\t"))
}

pub fn write_options(
    schema: &ResolvedSchema,
    options: &FilterOptions,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    writeln!(out, "role\tfield\tvalues")?;
    for role in CATEGORICAL_ROLES {
        let field = schema.field(role).unwrap_or("-");
        let values = if schema.field(role).is_some() {
            options.for_role(role).join(", ")
        } else {
            "(disabled)".to_owned()
        };
        writeln!(
            out,
            "{}\t{}\t{}",
            role.as_str(),
            normalize_field(field),
            normalize_field(&values)
        )?;
    }
    writeln!(
        out,
        "{}\t{}\tALL, IQR, Z",
        SemanticRole::Method.as_str(),
        normalize_field(schema.method_field())
    )
}

pub fn write_groups(groups: &GroupOutcome, out: &mut dyn Write) -> std::io::Result<()> {
    match groups.pretty() {
        Some(pretty) => writeln!(out, "{pretty}"),
        None => writeln!(out, "top_groups.json not found."),
    }
}

fn normalize_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
