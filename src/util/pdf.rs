use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use text_placeholder::Template;
use tracing::{debug, instrument, warn};
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_kit::fonts::{FontSearcher, Fonts};
use typst_pdf::PdfOptions;

use crate::config::CompanyConfig;
use crate::model::pricing::QuoteSummary;
use crate::model::quote::{BillingDetails, ClientDetails};

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("Document compilation failed: {0}")]
    Compile(String),

    #[error("PDF export failed: {0}")]
    Export(String),
}

static LIBRARY: LazyLock<LazyHash<Library>> =
    LazyLock::new(|| LazyHash::new(Library::builder().build()));

// Embedded fonts only: renders are identical across machines and need no
// font installation.
static FONTS: LazyLock<Fonts> =
    LazyLock::new(|| FontSearcher::new().include_system_fonts(false).search());

static BOOK: LazyLock<LazyHash<FontBook>> = LazyLock::new(|| LazyHash::new(FONTS.book.clone()));

/// Everything a document render needs. Dates are inputs, not side effects,
/// so rendering the same request twice produces byte-identical output.
pub struct DocumentInput<'a> {
    pub reference: &'a str,
    pub client: &'a ClientDetails,
    pub summary: &'a QuoteSummary,
    pub notes: Option<&'a str>,
    pub billing: Option<&'a BillingDetails>,
    pub emission: NaiveDate,
    pub expiry: NaiveDate,
}

/// Renders quotes and contracts as paginated A4 documents, in memory.
pub struct PdfRenderer {
    company: CompanyConfig,
    template_dir: PathBuf,
    assets_dir: PathBuf,
}

impl PdfRenderer {
    pub fn new(company: CompanyConfig, template_dir: PathBuf, assets_dir: PathBuf) -> Self {
        PdfRenderer { company, template_dir, assets_dir }
    }

    /// Render the quote document
    #[instrument(skip(self, input), fields(reference = %input.reference))]
    pub fn render_quote(&self, input: &DocumentInput<'_>) -> Result<Vec<u8>, PdfError> {
        let markup = self.fill_template("quote.typ.tpl", input)?;
        self.compile(markup, input.emission)
    }

    /// Render the contract variant: same computation, plus the billing
    /// identity and contract boilerplate.
    #[instrument(skip(self, input), fields(reference = %input.reference))]
    pub fn render_contract(&self, input: &DocumentInput<'_>) -> Result<Vec<u8>, PdfError> {
        if input.billing.is_none() {
            return Err(PdfError::Template(
                "contract render requires billing details".to_string(),
            ));
        }
        let markup = self.fill_template("contract.typ.tpl", input)?;
        self.compile(markup, input.emission)
    }

    fn fill_template(&self, name: &str, input: &DocumentInput<'_>) -> Result<String, PdfError> {
        let path = self.template_dir.join(name);
        let template_str = fs::read_to_string(&path)
            .map_err(|e| PdfError::Template(format!("cannot read {}: {}", path.display(), e)))?;
        let template = Template::new(&template_str);

        let company_name = typst_escape(&self.company.name);
        let client_name = typst_escape(&input.client.name);
        let logo_block = self.logo_block();
        let company_block = self.company_block();
        let client_block = client_block(input.client);
        let billing_block = input.billing.map(billing_block).unwrap_or_default();
        let reference = typst_escape(input.reference);
        let service_rows = service_rows(input.summary);
        let totals_block = totals_block(input.summary);
        let notes_block = notes_block(input.notes);
        let billing_conditions = billing_conditions(input.summary);
        let emission_date = input.emission.format("%d/%m/%Y").to_string();
        let expiry_date = input.expiry.format("%d/%m/%Y").to_string();
        let confirmation_banner = format!(
            "Para aceptar este presupuesto responda al correo recibido o llámenos al {} indicando la referencia {}.",
            typst_escape(&self.company.phone),
            typst_escape(input.reference),
        );
        let legal_footer = format!(
            "{} · CIF {} · {} · Los datos facilitados se tratan únicamente para elaborar y dar seguimiento a este documento conforme al RGPD. Precios con IVA al 21% incluido donde se indica.",
            typst_escape(&self.company.legal_name),
            typst_escape(&self.company.nif),
            typst_escape(&self.company.website),
        );

        let mut vars: HashMap<&str, &str> = HashMap::new();
        vars.insert("logo_block", &logo_block);
        vars.insert("company_name", &company_name);
        vars.insert("company_block", &company_block);
        vars.insert("client_name", &client_name);
        vars.insert("client_block", &client_block);
        vars.insert("billing_block", &billing_block);
        vars.insert("reference", &reference);
        vars.insert("service_rows", &service_rows);
        vars.insert("totals_block", &totals_block);
        vars.insert("notes_block", &notes_block);
        vars.insert("billing_conditions", &billing_conditions);
        vars.insert("emission_date", &emission_date);
        vars.insert("expiry_date", &expiry_date);
        vars.insert("confirmation_banner", &confirmation_banner);
        vars.insert("legal_footer", &legal_footer);

        Ok(template.fill_with_hashmap(&vars))
    }

    fn compile(&self, markup: String, emission: NaiveDate) -> Result<Vec<u8>, PdfError> {
        debug!("Compiling document ({} bytes of markup)", markup.len());
        let world = DocumentWorld::new(markup, self.assets_dir.clone(), emission);

        let result = typst::compile(&world);
        let document = result
            .output
            .map_err(|errors| PdfError::Compile(format!("{:?}", errors)))?;

        let pdf_data = typst_pdf::pdf(&document, &PdfOptions::default())
            .map_err(|e| PdfError::Export(format!("{:?}", e)))?;

        Ok(pdf_data)
    }

    /// Logo in the top-right corner; a missing asset falls back to the
    /// company name in plain text instead of failing the render.
    fn logo_block(&self) -> String {
        let logo_path = self.assets_dir.join("logo.png");
        if logo_path.is_file() {
            "#place(top + right, image(\"logo.png\", width: 3.4cm))".to_string()
        } else {
            warn!("Logo asset {} missing, using text fallback", logo_path.display());
            format!(
                "#place(top + right, text(weight: \"bold\", size: 14pt, fill: rgb(\"#1f4e79\"))[{}])",
                typst_escape(&self.company.name),
            )
        }
    }

    fn company_block(&self) -> String {
        [
            typst_escape(&self.company.legal_name),
            format!("CIF {}", typst_escape(&self.company.nif)),
            typst_escape(&self.company.address),
            typst_escape(&self.company.postal_city),
            format!(
                "{} · {}",
                typst_escape(&self.company.phone),
                typst_escape(&self.company.email),
            ),
        ]
        .join("\\\n")
    }
}

struct DocumentWorld {
    source: Source,
    main_id: FileId,
    assets_dir: PathBuf,
    today: Option<Datetime>,
}

impl DocumentWorld {
    fn new(source_text: String, assets_dir: PathBuf, emission: NaiveDate) -> Self {
        let main_id = FileId::new(None, VirtualPath::new("main.typ"));
        let source = Source::new(main_id, source_text);
        let today = Datetime::from_ymd(
            emission.year(),
            emission.month() as u8,
            emission.day() as u8,
        );
        Self { source, main_id, assets_dir, today }
    }
}

impl World for DocumentWorld {
    fn library(&self) -> &LazyHash<Library> {
        &LIBRARY
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &BOOK
    }

    fn main(&self) -> FileId {
        self.main_id
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main_id {
            Ok(self.source.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        // Only local assets (the logo); no package support
        let path = self.assets_dir.join(id.vpath().as_rootless_path());
        let data = fs::read(&path).map_err(|_| FileError::NotFound(path))?;
        Ok(Bytes::new(data))
    }

    fn font(&self, index: usize) -> Option<Font> {
        FONTS.fonts.get(index).and_then(|slot| slot.get())
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        self.today
    }
}

fn client_block(client: &ClientDetails) -> String {
    let mut lines = vec![typst_escape(&client.name)];
    if let Some(address) = client.address.as_deref().filter(|s| !s.is_empty()) {
        lines.push(typst_escape(address));
    }
    if let Some(postal_code) = client.postal_code.as_deref().filter(|s| !s.is_empty()) {
        lines.push(typst_escape(postal_code));
    }
    lines.push(format!(
        "{} · {}",
        typst_escape(&client.phone),
        typst_escape(&client.email),
    ));
    lines.join("\\\n")
}

fn billing_block(billing: &BillingDetails) -> String {
    let mut lines = Vec::new();
    if let Some(company) = billing.company_name.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Razón social: {}", typst_escape(company)));
    }
    lines.push(format!("NIF/CIF: {}", typst_escape(&billing.nif)));
    lines.push(format!("Domicilio fiscal: {}", typst_escape(&billing.fiscal_address)));
    lines.push(format!("IBAN: {}", typst_escape(&billing.iban)));
    lines.join("\\\n")
}

fn service_rows(summary: &QuoteSummary) -> String {
    let mut rows = String::new();
    for (index, line) in summary.lines.iter().enumerate() {
        // Alternating row background, one shade per service (main row +
        // annotations sub-row)
        let fill = if index % 2 == 1 { "rgb(\"#f2f6fa\")" } else { "white" };

        let hours = if line.weekly_multiplier > 1 {
            format!("{} h × {}/sem", decimal_str(line.quantity), line.weekly_multiplier)
        } else {
            format!("{} h", decimal_str(line.quantity))
        };

        rows.push_str(&format!(
            "table.cell(fill: {fill})[{name}], table.cell(fill: {fill})[{hours}], \
             table.cell(fill: {fill})[{frequency}], table.cell(fill: {fill})[{rate}], \
             table.cell(fill: {fill})[{amount}],\n",
            fill = fill,
            name = typst_escape(line.kind.display_name()),
            hours = hours,
            frequency = line.frequency.display_name(),
            rate = format!("{}/h", money(line.price_per_hour)),
            amount = money(line.subtotal),
        ));

        let mut annotations = vec![format!("Tarifa {}", line.tariff.display_name())];
        if line.discount_percent > 0 {
            annotations.push(format!(
                "Descuento {} {}% aplicado en tarifa",
                line.frequency.display_name().to_lowercase(),
                line.discount_percent,
            ));
        }
        if line.surcharge > Decimal::ZERO {
            annotations.push(format!(
                "Suplemento servicio mínimo {} × {}",
                money(Decimal::new(15, 0)),
                line.weekly_multiplier,
            ));
        }
        rows.push_str(&format!(
            "table.cell(colspan: 5, fill: {fill}, inset: (left: 12pt, rest: 4pt))[#text(size: 8pt, fill: rgb(\"#5b6770\"))[{text}]],\n",
            fill = fill,
            text = annotations.join(" · "),
        ));
    }
    rows
}

fn totals_block(summary: &QuoteSummary) -> String {
    let summary_title = if summary.has_recurring() {
        "Resumen mensual"
    } else {
        "Resumen"
    };
    let summary_box = format!(
        "block(fill: rgb(\"#f5f5f5\"), inset: 10pt, radius: 3pt, width: 100%)[\n\
         #text(weight: \"bold\")[{title}]\\\n\
         Base imponible: {subtotal}\\\n\
         IVA (21%): {vat}\\\n\
         #text(weight: \"bold\")[Total: {total}]\n]",
        title = summary_title,
        subtotal = money(summary.subtotal),
        vat = money(summary.vat),
        total = money(summary.total),
    );

    if !summary.has_recurring() {
        return format!("#{summary_box}");
    }

    let mut sim_lines = Vec::new();
    for projection in &summary.projections {
        sim_lines.push(format!(
            "{name}: {hours} h en {occurrences} servicios\\\n\
             Con descuento: {with} · Sin descuento: {without}\\\n\
             #text(fill: rgb(\"#1e7d32\"))[Ahorro: {savings}]",
            name = typst_escape(projection.kind.display_name()),
            hours = decimal_str(projection.hours),
            occurrences = projection.occurrences,
            with = money(projection.total_with_discount),
            without = money(projection.total_without_discount),
            savings = money(projection.savings),
        ));
    }
    let simulation_box = format!(
        "block(fill: rgb(\"#eef7ee\"), inset: 10pt, radius: 3pt, width: 100%)[\n\
         #text(weight: \"bold\")[Simulación 4 semanas]\\\n\
         {lines}\n]",
        lines = sim_lines.join("\\\n"),
    );

    format!(
        "#grid(\n  columns: (1fr, 1fr),\n  gutter: 0.8cm,\n  {simulation_box},\n  {summary_box},\n)"
    )
}

fn notes_block(notes: Option<&str>) -> String {
    match notes.filter(|s| !s.trim().is_empty()) {
        Some(notes) => format!(
            "\n#v(0.3cm)\n#block(inset: 6pt, width: 100%)[#text(style: \"italic\", size: 9pt)[Observaciones: {}]]",
            typst_escape(notes),
        ),
        None => String::new(),
    }
}

fn billing_conditions(summary: &QuoteSummary) -> String {
    let mut paragraphs = Vec::new();
    if summary.has_recurring() {
        paragraphs.push(
            "Los servicios recurrentes se facturan por mensualidades vencidas durante los \
             primeros cinco días naturales del mes siguiente. El importe mensual mostrado \
             corresponde a la periodicidad contratada.",
        );
    }
    if summary.has_one_off() {
        paragraphs.push(
            "Los servicios puntuales se facturan a la finalización del trabajo y el pago se \
             realiza por transferencia o domiciliación en un plazo máximo de quince días.",
        );
    }
    if paragraphs.is_empty() {
        paragraphs.push("Condiciones de facturación según la periodicidad contratada.");
    }
    paragraphs.join("\n\n")
}

fn money(amount: Decimal) -> String {
    format!("{:.2} €", amount).replace('.', ",")
}

fn decimal_str(value: Decimal) -> String {
    value.normalize().to_string().replace('.', ",")
}

fn typst_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' | '#' | '$' | '@' | '[' | ']' | '{' | '}' | '*' | '_' | '`' | '<' | '>' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::quote::{Frequency, ServiceKind, ServiceSelection, Tariff};
    use crate::service::pricing_service::summarize;

    fn sample_summary(recurring: bool) -> QuoteSummary {
        let frequency = if recurring { Frequency::Semanal } else { Frequency::Unica };
        summarize(&[ServiceSelection {
            id: ServiceKind::Oficinas,
            quantity: Decimal::new(3, 0),
            frequency,
            tariff: Tariff::Basica,
            weekly_services: if recurring { Some(2) } else { None },
        }])
    }

    #[test]
    fn test_typst_escape() {
        assert_eq!(typst_escape("a@b.com"), "a\\@b.com");
        assert_eq!(typst_escape("C# *loud*"), "C\\# \\*loud\\*");
        assert_eq!(typst_escape("plain text"), "plain text");
    }

    #[test]
    fn test_money_uses_comma_decimals() {
        assert_eq!(money(Decimal::new(6897, 2)), "68,97 €");
        assert_eq!(money(Decimal::new(15, 0)), "15,00 €");
    }

    #[test]
    fn test_totals_block_shape_depends_on_recurrence() {
        let one_off = totals_block(&sample_summary(false));
        assert!(one_off.starts_with("#block"));
        assert!(!one_off.contains("Simulación"));

        let recurring = totals_block(&sample_summary(true));
        assert!(recurring.starts_with("#grid"));
        assert!(recurring.contains("Simulación 4 semanas"));
        assert!(recurring.contains("Resumen mensual"));
    }

    #[test]
    fn test_billing_conditions_variants() {
        assert!(billing_conditions(&sample_summary(true)).contains("recurrentes"));
        assert!(billing_conditions(&sample_summary(false)).contains("puntuales"));
    }

    #[test]
    fn test_service_rows_annotate_surcharge() {
        let summary = summarize(&[ServiceSelection {
            id: ServiceKind::LimpiezaPorHoras,
            quantity: Decimal::new(2, 0),
            frequency: Frequency::Semanal,
            tariff: Tariff::Premium,
            weekly_services: Some(2),
        }]);
        let rows = service_rows(&summary);
        assert!(rows.contains("Suplemento servicio mínimo"));
        assert!(rows.contains("Descuento semanal 15%"));
        assert!(rows.contains("2 h × 2/sem"));
    }
}
