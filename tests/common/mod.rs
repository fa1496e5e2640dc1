use matcher_lib::matching::manager::CollegeMatcher;
use matcher_lib::matching::registry::load_registry;
use matcher_lib::models::matching::FallbackStrategy;
use matcher_lib::utils::corrections::CorrectionTables;
use std::io::Write;
use tempfile::NamedTempFile;

pub const REGISTRY_JSON: &str = r#"[
  {"id": "MED0001", "name": "SAWAI MAN SINGH MEDICAL COLLEGE", "address": "JLN MARG, JAIPUR",
   "state": "RAJASTHAN", "type": "MEDICAL", "management": "GOVERNMENT",
   "university": "RAJASTHAN UNIVERSITY OF HEALTH SCIENCES"},
  {"id": "MED0002", "name": "RABINDRANATH TAGORE MEDICAL COLLEGE", "address": "UDAIPUR",
   "state": "RAJASTHAN", "type": "MEDICAL", "management": "GOVERNMENT"},
  {"id": "DEN0001", "name": "GOVERNMENT DENTAL COLLEGE", "address": "JAIPUR",
   "state": "RAJASTHAN", "type": "DENTAL", "management": "GOVERNMENT"},
  {"id": "MED0003", "name": "VARDHMAN MAHAVIR MEDICAL COLLEGE", "address": "SAFDARJUNG HOSPITAL",
   "state": "NEW DELHI", "type": "MEDICAL", "management": "GOVERNMENT"},
  {"id": "MED0004", "name": "MAULANA AZAD MEDICAL COLLEGE (IRWIN HOSPITAL MEDICAL COLLEGE)",
   "address": "BAHADUR SHAH ZAFAR MARG", "state": "DELHI (NCT)", "type": "MEDICAL"},
  {"id": "MED0005", "name": "GOVERNMENT MEDICAL COLLEGE KOZHIKODE",
   "address": "MEDICAL COLLEGE ROAD",
   "state": "KERALA", "type": "MEDICAL", "management": "GOVERNMENT"}
]"#;

pub fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

pub fn fixture_matcher(strategy: FallbackStrategy) -> CollegeMatcher {
    let file = write_temp(REGISTRY_JSON);
    let registry = load_registry(file.path()).expect("fixture registry loads");
    CollegeMatcher::new(registry, CorrectionTables::builtin(), strategy).expect("matcher builds")
}
