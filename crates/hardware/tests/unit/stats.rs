//! Statistics Report Tests.

use picosim_core::stats::{STATS_SECTIONS, SimStats};

fn sample() -> SimStats {
    let mut stats = SimStats::default();
    stats.cycles = 10;
    stats.instructions_retired = 4;
    stats.inst_alu = 1;
    stats.inst_load = 2;
    stats.inst_branch = 1;
    stats.exceptions_taken = 3;
    stats.resets = 1;
    stats.wait_nanos = 2_500_000;
    stats
}

#[test]
fn full_report_has_every_section() {
    let report = sample().to_string();
    for header in ["RP2040 SIMULATION STATISTICS", "sim_cycles", "INSTRUCTION MIX", "EXCEPTIONS"] {
        assert!(report.contains(header), "missing {header}:\n{report}");
    }
    assert_eq!(STATS_SECTIONS.len(), 3);
}

#[test]
fn summary_reports_cpi() {
    let report = sample().render_sections(&["summary".to_string()]);
    assert!(report.contains("sim_insts                4"), "{report}");
    assert!(report.contains("sim_cpi                  2.5000"), "{report}");
    assert!(!report.contains("INSTRUCTION MIX"));
}

#[test]
fn instruction_mix_reports_percentages() {
    let report = sample().render_sections(&["instruction_mix".to_string()]);
    assert!(report.contains("op.alu                 1 (25.00%)"), "{report}");
    assert!(report.contains("op.load                2 (50.00%)"), "{report}");
    assert!(report.contains("op.store               0 (0.00%)"), "{report}");
    assert!(!report.contains("sim_cycles"));
}

#[test]
fn exceptions_section_reports_idle_time() {
    let report = sample().render_sections(&["exceptions".to_string()]);
    assert!(report.contains("exceptions.taken       3"), "{report}");
    assert!(report.contains("resets                 1"), "{report}");
    assert!(report.contains("wait.virtual_ms        2.500"), "{report}");
    assert!(!report.contains("INSTRUCTION MIX"));
}

#[test]
fn empty_stats_do_not_divide_by_zero() {
    let report = SimStats::default().render_sections(&[]);
    assert!(report.contains("sim_cpi                  1.0000"), "{report}");
    assert!(!report.contains("NaN"));
}
