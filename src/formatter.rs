//! Output formatters for recovery results.
//!
//! This module provides trait-based formatters for rendering a recovery in
//! various output formats (human-readable, JSON, compact).

use crate::compare::{AccuracyReport, PadDifference, StateDiff};
use crate::compose::CompositionReport;
use crate::types::{CandidateTable, ComposedPad, Direction, PadMode, Provenance};
use crate::Recovery;
use std::path::Path;

/// Trait for formatting recoveries.
///
/// Implementors provide methods for rendering each component of a recovery,
/// plus a method to render the complete result.
pub trait RecoveryFormatter {
    /// Format the file path header.
    fn format_file(&self, path: &Path) -> String;

    /// Format the composition summary.
    fn format_summary(&self, report: &CompositionReport) -> Option<String>;

    /// Format the candidate table list.
    fn format_tables(&self, tables: &[CandidateTable]) -> Option<String>;

    /// Format the composed pads.
    fn format_pads(&self, pads: &[&ComposedPad]) -> Option<String>;

    /// Format the oracle accuracy report.
    fn format_accuracy(&self, accuracy: &AccuracyReport) -> Option<String>;

    /// Format the complete recovery.
    ///
    /// Default implementation concatenates all component outputs.
    fn format_recovery(&self, recovery: &Recovery, path: &Path) -> String {
        let mut parts = Vec::new();

        parts.push(self.format_file(path));

        if let Some(s) = self.format_summary(&recovery.report) {
            parts.push(s);
        }
        if let Some(s) = self.format_tables(&recovery.tables) {
            parts.push(s);
        }
        if let Some(s) = self.format_pads(&recovery.pads()) {
            parts.push(s);
        }
        if let Some(s) = recovery.accuracy.as_ref().and_then(|a| self.format_accuracy(a)) {
            parts.push(s);
        }

        parts.join("")
    }
}

/// Raw entry bytes as they appear in the image.
fn raw_hex(dw0: u32, dw1: u32) -> String {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&dw0.to_le_bytes());
    bytes[4..].copy_from_slice(&dw1.to_le_bytes());
    hex::encode(bytes)
}

fn function_label(pad: &ComposedPad) -> String {
    let r = &pad.record;
    match (r.mode, r.direction) {
        (PadMode::Gpio, Direction::Output) => format!("GPO={}", r.output_value.unwrap_or(0)),
        (PadMode::Gpio, Direction::Input) => "GPI".to_string(),
        (mode, _) => mode.to_string(),
    }
}

fn source_label(provenance: &Provenance) -> String {
    match provenance {
        Provenance::Table { table_id, .. } => format!("table #{}", table_id),
        Provenance::Synthesized { hint: Some(h) } => format!("hint @0x{:x}", h.address),
        Provenance::Synthesized { hint: None } => "synthesized".to_string(),
    }
}

/// Human-readable output formatter.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    /// Show verbose output (raw registers, provenance offsets)
    pub verbose: bool,
    /// Quiet mode (minimal output)
    pub quiet: bool,
    /// List every candidate table
    pub show_tables: bool,
}

impl HumanFormatter {
    /// Create a new human formatter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a verbose formatter.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    /// Create a quiet formatter.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }
}

impl RecoveryFormatter for HumanFormatter {
    fn format_file(&self, path: &Path) -> String {
        if self.quiet {
            String::new()
        } else {
            format!("File: {}\n", path.display())
        }
    }

    fn format_summary(&self, report: &CompositionReport) -> Option<String> {
        if self.quiet {
            return None;
        }
        let mut s = format!("  Mode:        {}\n", report.mode);
        s.push_str(&format!("  Base table:  #{}\n", report.base_table_id));
        if report.corrections > 0 {
            s.push_str(&format!("  Corrections: {}\n", report.corrections));
        }
        for layer in &report.layered {
            s.push_str(&format!(
                "  Layered:     {} from #{}\n",
                layer.bucket, layer.table_id
            ));
        }
        if report.synthesized > 0 {
            s.push_str(&format!("  Synthesized: {}\n", report.synthesized));
        }
        Some(s)
    }

    fn format_tables(&self, tables: &[CandidateTable]) -> Option<String> {
        if self.quiet || !(self.show_tables || self.verbose) {
            return None;
        }
        let mut s = String::from("  Tables:\n");
        for t in tables {
            s.push_str(&format!(
                "    #{:<3} 0x{:08x}  stride {:>2}  {:>3} entries  {:>5.1}%{}{}",
                t.id,
                t.offset,
                t.stride,
                t.entry_count,
                t.confidence * 100.0,
                if t.is_signature_match { "  sig" } else { "" },
                if t.is_vgpio { "  vgpio" } else { "" },
            ));
            if self.verbose {
                if let Some(first) = t.entries.first() {
                    s.push_str(&format!("  [{}]", raw_hex(first.raw.dw0, first.raw.dw1)));
                }
            }
            s.push('\n');
        }
        Some(s)
    }

    fn format_pads(&self, pads: &[&ComposedPad]) -> Option<String> {
        if self.quiet {
            return None;
        }
        let mut s = format!("  Pads ({}):\n", pads.len());
        for pad in pads {
            let r = &pad.record;
            s.push_str(&format!(
                "    {:<14} {:<6} {:<7} {:<9}",
                pad.name.name,
                function_label(pad),
                r.reset_domain.name(),
                r.termination.to_string()
            ));
            if r.has_interrupt() {
                s.push_str(&format!(" {}", r.interrupt_route));
            }
            if self.verbose {
                s.push_str(&format!(
                    "  dw0=0x{:08x} dw1=0x{:08x}  ({})",
                    r.dw0,
                    r.dw1,
                    source_label(&pad.provenance)
                ));
            } else if pad.provenance.is_synthesized() {
                s.push_str("  *");
            }
            s.push('\n');
        }
        Some(s)
    }

    fn format_accuracy(&self, accuracy: &AccuracyReport) -> Option<String> {
        let mut s = format!(
            "  Accuracy:    {}/{} ({:.1}%)\n",
            accuracy.matched, accuracy.total, accuracy.percent
        );
        if self.verbose {
            for m in &accuracy.mismatches {
                let actual = m.actual.map_or_else(|| "missing".to_string(), |a| a.to_string());
                s.push_str(&format!(
                    "    {}: expected {}, got {}\n",
                    m.name, m.expected, actual
                ));
            }
        }
        Some(s)
    }

    fn format_recovery(&self, recovery: &Recovery, path: &Path) -> String {
        if self.quiet {
            // Quiet mode: just "path: pads"
            return format!(
                "{}: {} pads ({} synthesized)\n",
                path.display(),
                recovery.state.len(),
                recovery.report.synthesized
            );
        }

        let mut parts = Vec::new();
        parts.push(self.format_file(path));
        if let Some(s) = self.format_summary(&recovery.report) {
            parts.push(s);
        }
        if let Some(s) = recovery.accuracy.as_ref().and_then(|a| self.format_accuracy(a)) {
            parts.push(s);
        }
        if let Some(s) = self.format_tables(&recovery.tables) {
            parts.push(s);
        }
        if let Some(s) = self.format_pads(&recovery.pads()) {
            parts.push(s);
        }
        parts.push(String::from("\n"));
        parts.join("")
    }
}

/// JSON output formatter.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Pretty-print JSON
    pub pretty: bool,
    /// Include every candidate table
    pub show_tables: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self {
            pretty: true,
            show_tables: false,
        }
    }
}

impl JsonFormatter {
    /// Create a new JSON formatter with pretty printing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact JSON formatter.
    pub fn compact() -> Self {
        Self {
            pretty: false,
            ..Self::default()
        }
    }
}

impl RecoveryFormatter for JsonFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new() // Handled in format_recovery
    }

    fn format_summary(&self, _report: &CompositionReport) -> Option<String> {
        None
    }

    fn format_tables(&self, _tables: &[CandidateTable]) -> Option<String> {
        None
    }

    fn format_pads(&self, _pads: &[&ComposedPad]) -> Option<String> {
        None
    }

    fn format_accuracy(&self, _accuracy: &AccuracyReport) -> Option<String> {
        None
    }

    fn format_recovery(&self, recovery: &Recovery, path: &Path) -> String {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            file: String,
            platform: &'a str,
            composition: &'a CompositionReport,
            accuracy: Option<&'a AccuracyReport>,
            tables: Option<Vec<TableJson>>,
            pads: Vec<PadJson<'a>>,
        }

        #[derive(serde::Serialize)]
        struct TableJson {
            id: usize,
            offset: String,
            stride: usize,
            entries: usize,
            confidence: f64,
            signature: bool,
            vgpio: bool,
        }

        #[derive(serde::Serialize)]
        struct PadJson<'a> {
            name: &'a str,
            group: &'a str,
            mode: &'static str,
            direction: Option<String>,
            output: Option<u8>,
            reset: &'static str,
            termination: String,
            interrupt: String,
            dw0: String,
            dw1: String,
            raw: String,
            provenance: &'a Provenance,
        }

        let tables = self.show_tables.then(|| {
            recovery
                .tables
                .iter()
                .map(|t| TableJson {
                    id: t.id,
                    offset: format!("0x{:x}", t.offset),
                    stride: t.stride,
                    entries: t.entry_count,
                    confidence: t.confidence,
                    signature: t.is_signature_match,
                    vgpio: t.is_vgpio,
                })
                .collect()
        });

        let output = JsonOutput {
            file: path.display().to_string(),
            platform: recovery.platform().name,
            composition: &recovery.report,
            accuracy: recovery.accuracy.as_ref(),
            tables,
            pads: recovery
                .pads()
                .into_iter()
                .map(|p| PadJson {
                    name: &p.name.name,
                    group: &p.name.group,
                    mode: p.record.mode.name(),
                    direction: p.record.gpio_direction().map(|d| d.to_string()),
                    output: p.record.output_value,
                    reset: p.record.reset_domain.name(),
                    termination: p.record.termination.to_string(),
                    interrupt: p.record.interrupt_route.to_string(),
                    dw0: format!("0x{:08x}", p.record.dw0),
                    dw1: format!("0x{:08x}", p.record.dw1),
                    raw: raw_hex(p.record.dw0, p.record.dw1),
                    provenance: &p.provenance,
                })
                .collect(),
        };

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

/// Compact single-line output formatter.
#[derive(Debug, Clone, Default)]
pub struct ShortFormatter;

impl ShortFormatter {
    /// Create a new short formatter.
    pub fn new() -> Self {
        Self
    }
}

impl RecoveryFormatter for ShortFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new() // Handled in format_recovery
    }

    fn format_summary(&self, _report: &CompositionReport) -> Option<String> {
        None
    }

    fn format_tables(&self, _tables: &[CandidateTable]) -> Option<String> {
        None
    }

    fn format_pads(&self, _pads: &[&ComposedPad]) -> Option<String> {
        None
    }

    fn format_accuracy(&self, _accuracy: &AccuracyReport) -> Option<String> {
        None
    }

    fn format_recovery(&self, recovery: &Recovery, path: &Path) -> String {
        let accuracy = recovery
            .accuracy
            .as_ref()
            .map(|a| format!("\t{:.1}%", a.percent))
            .unwrap_or_default();
        let base = recovery
            .base_table()
            .map(|t| format!("0x{:x}/{}", t.offset, t.stride))
            .unwrap_or_default();

        format!(
            "{}\t{}\t{}\t{}\t{}{}\n",
            path.display(),
            recovery.report.mode,
            base,
            recovery.state.len(),
            recovery.report.synthesized,
            accuracy
        )
    }
}

/// Render a two-image diff as a table.
pub fn format_state_diff(diff: &StateDiff, name_a: &str, name_b: &str) -> String {
    let mut s = format!(
        "{:<15} | {:<6} | {:<18} | {:<18}\n",
        "Pad", "Field", name_a, name_b
    );
    s.push_str(&format!("{}\n", "-".repeat(66)));

    for (label, set) in [("Physical", &diff.physical), ("Virtual", &diff.virtual_pads)] {
        for pad in &set.details {
            match &pad.difference {
                PadDifference::MissingInA => s.push_str(&format!(
                    "{:<15} | {:<6} | {:<18} | {:<18}\n",
                    pad.name, "-", "(missing)", "present"
                )),
                PadDifference::MissingInB => s.push_str(&format!(
                    "{:<15} | {:<6} | {:<18} | {:<18}\n",
                    pad.name, "-", "present", "(missing)"
                )),
                PadDifference::Fields { fields } => {
                    for f in fields {
                        s.push_str(&format!(
                            "{:<15} | {:<6} | {:<18} | {:<18}\n",
                            pad.name,
                            f.field.to_string(),
                            f.a,
                            f.b
                        ));
                    }
                }
            }
        }
        s.push_str(&format!(
            "{}: {} identical, {} differ, {} only in {}, {} only in {}\n",
            label, set.matches, set.mismatches, set.missing_b, name_a, set.missing_a, name_b
        ));
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::diff_states;
    use crate::scanner::test_support::{physical_table, virtual_table};
    use crate::types::ComposedState;

    fn recovery() -> Recovery {
        let mut data = vec![0u8; 256];
        data.extend_from_slice(&physical_table(252));
        data.extend(std::iter::repeat(0xFF).take(64));
        data.extend_from_slice(&virtual_table(12));
        data.extend(std::iter::repeat(0xFF).take(1024));
        crate::recover_bytes(&data).unwrap().into_recovery().unwrap()
    }

    #[test]
    fn test_human_output() {
        let r = recovery();
        let out = HumanFormatter::new().format_recovery(&r, Path::new("bios.bin"));
        assert!(out.starts_with("File: bios.bin\n"));
        assert!(out.contains("Mode:        blind"));
        assert!(out.contains("GPP_I0"));
        assert!(out.contains("VGPIO_USB_11"));
        assert!(!out.contains("Tables:"));
    }

    #[test]
    fn test_quiet_output() {
        let r = recovery();
        let out = HumanFormatter::quiet().format_recovery(&r, Path::new("bios.bin"));
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("bios.bin: "));
    }

    #[test]
    fn test_json_output() {
        let r = recovery();
        let out = JsonFormatter::new().format_recovery(&r, Path::new("bios.bin"));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["file"], "bios.bin");
        assert_eq!(value["pads"][0]["name"], "GPP_I0");
        assert_eq!(value["pads"][0]["raw"], "0000008000300000");
        assert_eq!(value["pads"][0]["provenance"]["source"], "table");
        assert!(value["tables"].is_null());
    }

    #[test]
    fn test_short_output() {
        let r = recovery();
        let out = ShortFormatter::new().format_recovery(&r, Path::new("bios.bin"));
        assert!(out.starts_with("bios.bin\tblind\t0x100/8\t"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_diff_table() {
        let r = recovery();
        let empty = ComposedState::new();
        let out = format_state_diff(&diff_states(&r.state, &empty), "a", "b");
        assert!(out.contains("(missing)"));
        assert!(out.contains("Physical: 0 identical"));
    }
}
