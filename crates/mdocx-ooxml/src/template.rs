//! Style templates
//!
//! Seven named templates each resolve to a [`StyleBundle`]: the text
//! formatting for headings, body paragraphs, code blocks, tables and
//! links. Lookup is pure; every call builds a fresh bundle. User
//! supplied [`CustomStyles`] are merged over a bundle field by field.

use std::fmt;
use std::str::FromStr;

use mdocx_diagrams::MermaidTheme;
use serde::{Deserialize, Serialize};

use crate::error::{OoxmlError, Result};
use crate::xml::escape_xml;

/// Paragraph style ids written into packages
pub mod style_ids {
    pub const NORMAL: &str = "Normal";
    pub const TITLE: &str = "Title";
    pub const CODE_BLOCK: &str = "CodeBlock";
    pub const QUOTE: &str = "Quote";
    pub const LIST_PARAGRAPH: &str = "ListParagraph";
    pub const CAPTION: &str = "Caption";
    pub const TOC_HEADING: &str = "TOCHeading";
    pub const HYPERLINK: &str = "Hyperlink";
    pub const TABLE: &str = "TableGrid";

    /// `Heading1` .. `Heading6`
    pub fn heading(level: u8) -> String {
        format!("Heading{}", level.clamp(1, 6))
    }

    /// `TOC1` .. `TOC6`
    pub fn toc(level: u8) -> String {
        format!("TOC{}", level.clamp(1, 6))
    }
}

/// Named style template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    #[default]
    ProfessionalReport,
    TechnicalDocumentation,
    BusinessProposal,
    AcademicPaper,
    Simple,
    Modern,
    Classic,
}

impl TemplateId {
    /// Template identifier as accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::ProfessionalReport => "professional-report",
            TemplateId::TechnicalDocumentation => "technical-documentation",
            TemplateId::BusinessProposal => "business-proposal",
            TemplateId::AcademicPaper => "academic-paper",
            TemplateId::Simple => "simple",
            TemplateId::Modern => "modern",
            TemplateId::Classic => "classic",
        }
    }

    /// One line description
    pub fn description(&self) -> &'static str {
        match self {
            TemplateId::ProfessionalReport => "Calibri, navy headings, generous spacing",
            TemplateId::TechnicalDocumentation => "Segoe UI body, shaded Consolas code blocks",
            TemplateId::BusinessProposal => "Georgia headings in burgundy over Arial body",
            TemplateId::AcademicPaper => "Times New Roman 12pt, justified, 1.5 line spacing",
            TemplateId::Simple => "Arial throughout, black bold headings",
            TemplateId::Modern => "Light sans headings with a teal accent",
            TemplateId::Classic => "Garamond, centered title heading",
        }
    }

    /// All templates
    pub fn all() -> &'static [TemplateId] {
        &[
            TemplateId::ProfessionalReport,
            TemplateId::TechnicalDocumentation,
            TemplateId::BusinessProposal,
            TemplateId::AcademicPaper,
            TemplateId::Simple,
            TemplateId::Modern,
            TemplateId::Classic,
        ]
    }
}

impl FromStr for TemplateId {
    type Err = OoxmlError;

    fn from_str(s: &str) -> Result<Self> {
        TemplateId::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| OoxmlError::InvalidTemplate(format!("unknown template \"{}\"", s)))
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    fn as_ooxml(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }
}

/// Formatting for one kind of element. Unset fields inherit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextStyle {
    /// Font family
    pub font: Option<String>,
    /// Size in points
    pub size: Option<f32>,
    /// Text colour as `RRGGBB`
    pub color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub alignment: Option<Alignment>,
    /// Space before the paragraph, in points
    pub spacing_before: Option<f32>,
    /// Space after the paragraph, in points
    pub spacing_after: Option<f32>,
    /// Line spacing as a multiple of single spacing
    pub line_spacing: Option<f32>,
    /// Shading colour as `RRGGBB`
    pub background: Option<String>,
    /// Border colour as `RRGGBB`
    pub border_color: Option<String>,
}

impl TextStyle {
    /// Overlay `other` on `self`; fields set in `other` win
    pub fn merged(&self, other: &TextStyle) -> TextStyle {
        TextStyle {
            font: other.font.clone().or_else(|| self.font.clone()),
            size: other.size.or(self.size),
            color: other.color.clone().or_else(|| self.color.clone()),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            underline: other.underline.or(self.underline),
            alignment: other.alignment.or(self.alignment),
            spacing_before: other.spacing_before.or(self.spacing_before),
            spacing_after: other.spacing_after.or(self.spacing_after),
            line_spacing: other.line_spacing.or(self.line_spacing),
            background: other.background.clone().or_else(|| self.background.clone()),
            border_color: other.border_color.clone().or_else(|| self.border_color.clone()),
        }
    }

    fn font(font: &str, size: f32) -> Self {
        TextStyle {
            font: Some(font.to_string()),
            size: Some(size),
            ..Default::default()
        }
    }

    fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    fn spacing(mut self, before: f32, after: f32) -> Self {
        self.spacing_before = Some(before);
        self.spacing_after = Some(after);
        self
    }

    /// `<w:pPr>` children for this style
    fn paragraph_properties(&self) -> String {
        let mut xml = String::new();
        if let Some(ref border) = self.border_color {
            let border = escape_xml(border);
            xml.push_str("<w:pBdr>");
            for side in ["top", "left", "bottom", "right"] {
                xml.push_str(&format!(
                    r#"<w:{} w:val="single" w:sz="4" w:space="4" w:color="{}"/>"#,
                    side, border
                ));
            }
            xml.push_str("</w:pBdr>");
        }
        if let Some(ref background) = self.background {
            xml.push_str(&format!(
                r#"<w:shd w:val="clear" w:color="auto" w:fill="{}"/>"#,
                escape_xml(background)
            ));
        }
        if self.spacing_before.is_some() || self.spacing_after.is_some() || self.line_spacing.is_some() {
            xml.push_str("<w:spacing");
            if let Some(before) = self.spacing_before {
                xml.push_str(&format!(r#" w:before="{}""#, twips(before)));
            }
            if let Some(after) = self.spacing_after {
                xml.push_str(&format!(r#" w:after="{}""#, twips(after)));
            }
            if let Some(line) = self.line_spacing {
                xml.push_str(&format!(
                    r#" w:line="{}" w:lineRule="auto""#,
                    (line * 240.0).round() as u32
                ));
            }
            xml.push_str("/>");
        }
        if let Some(alignment) = self.alignment {
            xml.push_str(&format!(r#"<w:jc w:val="{}"/>"#, alignment.as_ooxml()));
        }
        xml
    }

    /// `<w:rPr>` children for this style
    fn run_properties(&self) -> String {
        let mut xml = String::new();
        if let Some(ref font) = self.font {
            let font = escape_xml(font);
            xml.push_str(&format!(
                r#"<w:rFonts w:ascii="{0}" w:hAnsi="{0}" w:cs="{0}"/>"#,
                font
            ));
        }
        if let Some(bold) = self.bold {
            xml.push_str(if bold { "<w:b/>" } else { r#"<w:b w:val="0"/>"# });
        }
        if let Some(italic) = self.italic {
            xml.push_str(if italic { "<w:i/>" } else { r#"<w:i w:val="0"/>"# });
        }
        if let Some(ref color) = self.color {
            xml.push_str(&format!(r#"<w:color w:val="{}"/>"#, escape_xml(color)));
        }
        if let Some(size) = self.size {
            let half_points = (size * 2.0).round() as u32;
            xml.push_str(&format!(
                r#"<w:sz w:val="{0}"/><w:szCs w:val="{0}"/>"#,
                half_points
            ));
        }
        if let Some(underline) = self.underline {
            let val = if underline { "single" } else { "none" };
            xml.push_str(&format!(r#"<w:u w:val="{}"/>"#, val));
        }
        xml
    }
}

fn twips(points: f32) -> u32 {
    (points * 20.0).round().max(0.0) as u32
}

/// Per-element overrides supplied by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomStyles {
    pub h1: Option<TextStyle>,
    pub h2: Option<TextStyle>,
    pub h3: Option<TextStyle>,
    pub h4: Option<TextStyle>,
    pub h5: Option<TextStyle>,
    pub h6: Option<TextStyle>,
    pub paragraph: Option<TextStyle>,
    pub code_block: Option<TextStyle>,
    pub table: Option<TextStyle>,
    pub link: Option<TextStyle>,
}

impl CustomStyles {
    fn headings(&self) -> [Option<&TextStyle>; 6] {
        [
            self.h1.as_ref(),
            self.h2.as_ref(),
            self.h3.as_ref(),
            self.h4.as_ref(),
            self.h5.as_ref(),
            self.h6.as_ref(),
        ]
    }
}

/// Resolved formatting for every element kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleBundle {
    pub template: TemplateId,
    /// Levels 1 through 6
    pub headings: [TextStyle; 6],
    pub paragraph: TextStyle,
    pub code_block: TextStyle,
    pub table: TextStyle,
    pub link: TextStyle,
}

impl StyleBundle {
    /// Formatting for a heading level, clamped to 1-6
    pub fn heading(&self, level: u8) -> &TextStyle {
        &self.headings[level.clamp(1, 6) as usize - 1]
    }

    /// Merge user overrides over this bundle, field by field
    pub fn with_overrides(mut self, custom: &CustomStyles) -> Self {
        for (heading, over) in self.headings.iter_mut().zip(custom.headings()) {
            if let Some(over) = over {
                *heading = heading.merged(over);
            }
        }
        let merge = |base: &mut TextStyle, over: &Option<TextStyle>| {
            if let Some(over) = over {
                *base = base.merged(over);
            }
        };
        merge(&mut self.paragraph, &custom.paragraph);
        merge(&mut self.code_block, &custom.code_block);
        merge(&mut self.table, &custom.table);
        merge(&mut self.link, &custom.link);
        self
    }

    /// Generate `word/styles.xml`
    pub fn to_styles_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        );
        xml.push('\n');

        xml.push_str("<w:docDefaults><w:rPrDefault><w:rPr>");
        xml.push_str(&self.paragraph.run_properties());
        xml.push_str("</w:rPr></w:rPrDefault><w:pPrDefault><w:pPr>");
        xml.push_str(&self.paragraph.paragraph_properties());
        xml.push_str("</w:pPr></w:pPrDefault></w:docDefaults>\n");

        push_style(&mut xml, "paragraph", style_ids::NORMAL, "Normal", None, &self.paragraph, None);
        push_style(&mut xml, "paragraph", style_ids::TITLE, "Title", Some(style_ids::NORMAL), self.heading(1), None);

        for level in 1..=6u8 {
            push_style(
                &mut xml,
                "paragraph",
                &style_ids::heading(level),
                &format!("heading {}", level),
                Some(style_ids::NORMAL),
                self.heading(level),
                Some(level - 1),
            );
        }

        push_style(&mut xml, "paragraph", style_ids::CODE_BLOCK, "Code Block", Some(style_ids::NORMAL), &self.code_block, None);

        let quote = TextStyle {
            italic: Some(true),
            color: Some("595959".to_string()),
            ..Default::default()
        };
        push_style(&mut xml, "paragraph", style_ids::QUOTE, "Quote", Some(style_ids::NORMAL), &quote, None);

        let list = TextStyle {
            spacing_after: Some(2.0),
            ..Default::default()
        };
        push_style(&mut xml, "paragraph", style_ids::LIST_PARAGRAPH, "List Paragraph", Some(style_ids::NORMAL), &list, None);

        let caption = TextStyle {
            italic: Some(true),
            size: self.paragraph.size.map(|s| (s - 1.0).max(6.0)),
            ..Default::default()
        };
        push_style(&mut xml, "paragraph", style_ids::CAPTION, "caption", Some(style_ids::NORMAL), &caption, None);

        let toc_heading = self.heading(1).merged(&TextStyle {
            spacing_after: Some(12.0),
            ..Default::default()
        });
        push_style(&mut xml, "paragraph", style_ids::TOC_HEADING, "TOC Heading", Some(style_ids::NORMAL), &toc_heading, None);
        for level in 1..=6u8 {
            let toc = TextStyle {
                spacing_after: Some(2.0),
                ..Default::default()
            };
            push_style(
                &mut xml,
                "paragraph",
                &style_ids::toc(level),
                &format!("toc {}", level),
                Some(style_ids::NORMAL),
                &toc,
                None,
            );
        }

        push_style(&mut xml, "character", style_ids::HYPERLINK, "Hyperlink", None, &self.link, None);

        // Table style with borders
        let border = self
            .table
            .border_color
            .as_deref()
            .map(escape_xml)
            .unwrap_or_else(|| "auto".to_string());
        xml.push_str(&format!(
            r#"<w:style w:type="table" w:styleId="{}"><w:name w:val="Table Grid"/>"#,
            style_ids::TABLE
        ));
        let table_run = self.table.run_properties();
        if !table_run.is_empty() {
            xml.push_str(&format!("<w:rPr>{}</w:rPr>", table_run));
        }
        xml.push_str("<w:tblPr><w:tblBorders>");
        for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            xml.push_str(&format!(
                r#"<w:{} w:val="single" w:sz="4" w:space="0" w:color="{}"/>"#,
                side, border
            ));
        }
        xml.push_str("</w:tblBorders></w:tblPr>");
        if let Some(ref fill) = self.table.background {
            xml.push_str(&format!(
                r#"<w:tblStylePr w:type="firstRow"><w:rPr><w:b/></w:rPr><w:tcPr><w:shd w:val="clear" w:color="auto" w:fill="{}"/></w:tcPr></w:tblStylePr>"#,
                escape_xml(fill)
            ));
        }
        xml.push_str("</w:style>\n");

        xml.push_str("</w:styles>");
        xml
    }
}

fn push_style(
    xml: &mut String,
    style_type: &str,
    id: &str,
    name: &str,
    based_on: Option<&str>,
    style: &TextStyle,
    outline_level: Option<u8>,
) {
    let default = if id == style_ids::NORMAL {
        r#" w:default="1""#
    } else {
        ""
    };
    xml.push_str(&format!(
        r#"<w:style w:type="{}"{} w:styleId="{}"><w:name w:val="{}"/>"#,
        style_type, default, id, name
    ));
    if let Some(base) = based_on {
        xml.push_str(&format!(r#"<w:basedOn w:val="{}"/>"#, base));
    }
    if style_type == "paragraph" && id != style_ids::NORMAL {
        xml.push_str(&format!(r#"<w:next w:val="{}"/>"#, style_ids::NORMAL));
    }
    xml.push_str("<w:qFormat/>");

    let mut ppr = String::new();
    if outline_level.is_some() {
        ppr.push_str("<w:keepNext/>");
    }
    ppr.push_str(&style.paragraph_properties());
    if let Some(level) = outline_level {
        ppr.push_str(&format!(r#"<w:outlineLvl w:val="{}"/>"#, level));
    }
    if !ppr.is_empty() && style_type == "paragraph" {
        xml.push_str(&format!("<w:pPr>{}</w:pPr>", ppr));
    }
    let rpr = style.run_properties();
    if !rpr.is_empty() {
        xml.push_str(&format!("<w:rPr>{}</w:rPr>", rpr));
    }
    xml.push_str("</w:style>\n");
}

fn headings(font: &str, color: &str, sizes: [f32; 6], bold: bool) -> [TextStyle; 6] {
    sizes.map(|size| {
        let style = TextStyle::font(font, size).color(color).spacing(12.0, 4.0);
        if bold {
            style.bold()
        } else {
            style
        }
    })
}

fn code(font: &str, size: f32, background: &str, border: &str) -> TextStyle {
    TextStyle {
        background: Some(background.to_string()),
        border_color: Some(border.to_string()),
        spacing_before: Some(6.0),
        spacing_after: Some(6.0),
        line_spacing: Some(1.0),
        ..TextStyle::font(font, size)
    }
}

fn link(color: &str) -> TextStyle {
    TextStyle {
        color: Some(color.to_string()),
        underline: Some(true),
        ..Default::default()
    }
}

/// The bundle for a template
pub fn bundle(template: TemplateId) -> StyleBundle {
    match template {
        TemplateId::ProfessionalReport => StyleBundle {
            template,
            headings: headings("Calibri Light", "1F3864", [20.0, 16.0, 14.0, 12.0, 11.0, 11.0], true),
            paragraph: TextStyle::font("Calibri", 11.0).spacing(0.0, 8.0),
            code_block: code("Consolas", 9.5, "F2F2F2", "BFBFBF"),
            table: TextStyle {
                border_color: Some("8EAADB".to_string()),
                background: Some("D9E2F3".to_string()),
                ..Default::default()
            },
            link: link("2E74B5"),
        },
        TemplateId::TechnicalDocumentation => StyleBundle {
            template,
            headings: headings("Segoe UI Semibold", "2E74B5", [18.0, 15.0, 13.0, 12.0, 11.0, 10.5], false),
            paragraph: TextStyle::font("Segoe UI", 10.5).spacing(0.0, 6.0),
            code_block: code("Consolas", 9.0, "F6F8FA", "D0D7DE"),
            table: TextStyle {
                border_color: Some("D0D7DE".to_string()),
                background: Some("F6F8FA".to_string()),
                size: Some(9.5),
                ..Default::default()
            },
            link: link("0969DA"),
        },
        TemplateId::BusinessProposal => StyleBundle {
            template,
            headings: headings("Georgia", "7B2C2C", [22.0, 16.0, 13.0, 12.0, 11.0, 11.0], true),
            paragraph: TextStyle {
                line_spacing: Some(1.15),
                ..TextStyle::font("Arial", 11.0).spacing(0.0, 10.0)
            },
            code_block: code("Courier New", 9.5, "F7F3F3", "D9C5C5"),
            table: TextStyle {
                border_color: Some("7B2C2C".to_string()),
                background: Some("F2E6E6".to_string()),
                ..Default::default()
            },
            link: link("7B2C2C"),
        },
        TemplateId::AcademicPaper => {
            let mut headings = headings("Times New Roman", "000000", [14.0, 13.0, 12.0, 12.0, 12.0, 12.0], true);
            headings[0].alignment = Some(Alignment::Center);
            headings[3].italic = Some(true);
            StyleBundle {
                template,
                headings,
                paragraph: TextStyle {
                    alignment: Some(Alignment::Justify),
                    line_spacing: Some(1.5),
                    ..TextStyle::font("Times New Roman", 12.0).spacing(0.0, 0.0)
                },
                code_block: code("Courier New", 10.0, "FFFFFF", "000000"),
                table: TextStyle {
                    border_color: Some("000000".to_string()),
                    size: Some(10.0),
                    ..Default::default()
                },
                link: link("000000"),
            }
        }
        TemplateId::Simple => StyleBundle {
            template,
            headings: headings("Arial", "000000", [18.0, 15.0, 13.0, 12.0, 11.0, 11.0], true),
            paragraph: TextStyle::font("Arial", 11.0).spacing(0.0, 6.0),
            code_block: code("Courier New", 10.0, "F5F5F5", "CCCCCC"),
            table: TextStyle {
                border_color: Some("000000".to_string()),
                ..Default::default()
            },
            link: link("0563C1"),
        },
        TemplateId::Modern => StyleBundle {
            template,
            headings: headings("Segoe UI Light", "0F9D8A", [26.0, 18.0, 14.0, 12.0, 11.0, 11.0], false),
            paragraph: TextStyle {
                color: Some("333333".to_string()),
                line_spacing: Some(1.2),
                ..TextStyle::font("Segoe UI", 10.5).spacing(0.0, 8.0)
            },
            code_block: code("Cascadia Code", 9.5, "EEF7F6", "0F9D8A"),
            table: TextStyle {
                border_color: Some("A3D9D1".to_string()),
                background: Some("0F9D8A".to_string()),
                ..Default::default()
            },
            link: link("0F9D8A"),
        },
        TemplateId::Classic => {
            let mut headings = headings("Garamond", "000000", [20.0, 16.0, 14.0, 12.0, 12.0, 12.0], true);
            headings[0].alignment = Some(Alignment::Center);
            headings[2].italic = Some(true);
            StyleBundle {
                template,
                headings,
                paragraph: TextStyle {
                    alignment: Some(Alignment::Justify),
                    ..TextStyle::font("Garamond", 12.0).spacing(0.0, 6.0)
                },
                code_block: code("Courier New", 10.0, "FAFAF5", "A6A6A6"),
                table: TextStyle {
                    border_color: Some("404040".to_string()),
                    ..Default::default()
                },
                link: link("1F3864"),
            }
        }
    }
}

/// Resolve a template identifier
pub fn lookup(template: &str) -> Result<StyleBundle> {
    Ok(bundle(template.parse()?))
}

/// Resolve a diagram theme identifier
pub fn lookup_theme(theme: &str) -> Result<MermaidTheme> {
    theme
        .parse()
        .map_err(|_| OoxmlError::InvalidTemplate(format!("unknown diagram theme \"{}\"", theme)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_resolve() {
        for template in TemplateId::all() {
            let bundle = lookup(template.as_str()).unwrap();
            assert_eq!(bundle.template, *template);
            assert!(bundle.paragraph.font.is_some());
        }
        assert_eq!(TemplateId::all().len(), 7);
    }

    #[test]
    fn test_unknown_template_is_invalid() {
        assert!(matches!(lookup("fancy"), Err(OoxmlError::InvalidTemplate(_))));
    }

    #[test]
    fn test_theme_lookup() {
        for theme in ["default", "forest", "dark", "neutral", "base"] {
            assert_eq!(lookup_theme(theme).unwrap().as_str(), theme);
        }
        assert!(matches!(lookup_theme("sepia"), Err(OoxmlError::InvalidTemplate(_))));
    }

    #[test]
    fn test_overrides_merge_field_by_field() {
        let base = bundle(TemplateId::Simple);
        let custom = CustomStyles {
            h1: Some(TextStyle {
                color: Some("FF0000".to_string()),
                ..Default::default()
            }),
            code_block: Some(TextStyle {
                font: Some("Fira Code".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = base.clone().with_overrides(&custom);

        assert_eq!(merged.heading(1).color.as_deref(), Some("FF0000"));
        assert_eq!(merged.heading(1).size, base.heading(1).size);
        assert_eq!(merged.heading(1).font, base.heading(1).font);
        assert_eq!(merged.code_block.font.as_deref(), Some("Fira Code"));
        assert_eq!(merged.code_block.background, base.code_block.background);
        assert_eq!(merged.heading(2), base.heading(2));
    }

    #[test]
    fn test_custom_styles_from_camel_case() {
        let custom: CustomStyles = serde_json::from_str(
            r#"{"h2": {"size": 15, "bold": false}, "codeBlock": {"spacingAfter": 4}}"#,
        )
        .unwrap();
        assert_eq!(custom.h2.as_ref().and_then(|s| s.size), Some(15.0));
        assert_eq!(custom.code_block.and_then(|s| s.spacing_after), Some(4.0));
    }

    #[test]
    fn test_styles_xml_has_heading_outline_levels() {
        let xml = bundle(TemplateId::ProfessionalReport).to_styles_xml();
        assert!(xml.contains(r#"w:styleId="Heading1""#));
        assert!(xml.contains(r#"<w:outlineLvl w:val="5"/>"#));
        assert!(xml.contains(r#"w:styleId="CodeBlock""#));
        assert!(xml.contains(r#"w:type="character" w:styleId="Hyperlink""#));
        assert!(xml.contains(r#"<w:sz w:val="40"/>"#));
    }
}
