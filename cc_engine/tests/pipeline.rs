use approx::assert_relative_eq;
use cc_engine::app::{CcApplication, ResultsReport};
use cc_engine::config::{parse_input, Args};
use cc_engine::mixer::MixerType;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const H11: f64 = -1.2528;
const H22: f64 = -0.4756;
const J11: f64 = 0.6746;
const J22: f64 = 0.6975;
const J12: f64 = 0.6636;
const K12: f64 = 0.1813;
const CORE: f64 = 0.7137;

fn fcidump() -> String {
    format!(
        " &FCI NORB=  2,NELEC=  2,MS2=0,\n  ORBSYM=1,5,\n  ISYM=1,\n &END\n\
         {J11:.10}  1  1  1  1\n\
         {J12:.10}  1  1  2  2\n\
         {K12:.10}  2  1  2  1\n\
         {J22:.10}  2  2  2  2\n\
         {H11:.10}  1  1  0  0\n\
         {H22:.10}  2  2  0  0\n\
         {CORE:.10}  0  0  0  0\n"
    )
}

fn reference_energy() -> f64 {
    2.0 * H11 + J11 + CORE
}

fn exact_correlation() -> f64 {
    let e_hf = 2.0 * H11 + J11;
    let e_d = 2.0 * H22 + J22;
    0.5 * (e_d - e_hf) - ((0.5 * (e_d - e_hf)).powi(2) + K12 * K12).sqrt()
}

/// Writes `input` next to the results file and points the arguments at it.
fn args(dir: &Path, input: &str) -> Args {
    let input_path = dir.join("input.yaml");
    fs::write(&input_path, input).unwrap();
    Args {
        input: input_path.display().to_string(),
        output: None,
        results: dir.join("results.yaml").display().to_string(),
        max_iterations: None,
        mixer: None,
    }
}

fn record<'a>(report: &'a ResultsReport, name: &str) -> &'a cc_engine::app::StepRecord {
    report.steps.iter().find(|s| s.name == name).unwrap()
}

#[test]
fn full_pipeline_on_two_electron_model() {
    let dir = tempdir().unwrap();
    let fcidump_path = dir.path().join("h2.fcidump");
    fs::write(&fcidump_path, fcidump()).unwrap();
    let t2_path = dir.path().join("t2.bin");
    let amplitudes_path = dir.path().join("ccsd_t{level}.bin");
    let roots_path = dir.path().join("eom_r{root}_t{level}.bin");
    let root0_path = dir.path().join("eom_r0_t{level}.bin");

    let input = format!(
        r#"
steps:
  - name: FcidumpReader
    in:
      file: "{fcidump}"
    out:
      integrals: Integrals
      referenceEnergy: ReferenceEnergy
  - name: Mp2
    in:
      integrals: Integrals
    out:
      energy: Mp2Energy
      amplitudes: Mp2Amplitudes
  - name: ccsd
    in:
      integrals: Integrals
      initialAmplitudes: Mp2Amplitudes
      mixerType: DIIS
      maxIterations: 100
      energyConvergence: 1.0e-11
      amplitudesConvergence: 1.0e-10
    out:
      energy: CcsdEnergy
      amplitudes: CcsdAmplitudes
  - name: PerturbativeTriples
    in:
      integrals: Integrals
      amplitudes: CcsdAmplitudes
      ccsdEnergy: CcsdEnergy
    out:
      energy: TriplesEnergy
  - name: EomCcsd
    in:
      integrals: Integrals
      amplitudes: CcsdAmplitudes
      nRoots: 4
      tolerance: 1.0e-7
    out:
      energies: ExcitationEnergies
      eigenpairs: EomStates
  - name: TensorWriter
    in:
      data: CcsdAmplitudes
      level: 2
      file: "{t2}"
  - name: TensorReader
    in:
      file: "{t2}"
    out:
      tensor: T2
  - name: Delete
    in:
      data: Mp2Amplitudes
  - name: TensorWriter
    in:
      data: CcsdAmplitudes
      file: "{amplitudes}"
  - name: TensorReader
    in:
      file: "{amplitudes}"
    out:
      amplitudes: SavedAmplitudes
  - name: Ccsd
    in:
      integrals: Integrals
      initialAmplitudes: SavedAmplitudes
      maxIterations: 10
      energyConvergence: 1.0e-9
      amplitudesConvergence: 1.0e-9
    out:
      energy: RestartedEnergy
  - name: TensorWriter
    in:
      data: EomStates
      file: "{roots}"
  - name: TensorReader
    in:
      file: "{root0}"
      levels: 2
    out:
      amplitudes: LowestState
  - name: eomccsd
    in:
      integrals: Integrals
      amplitudes: SavedAmplitudes
      initialGuesses: LowestState
      nRoots: 1
      tolerance: 1.0e-7
"#,
        fcidump = fcidump_path.display(),
        t2 = t2_path.display(),
        amplitudes = amplitudes_path.display(),
        roots = roots_path.display(),
        root0 = root0_path.display(),
    );
    let args = args(dir.path(), &input);
    let input = parse_input(&fs::read_to_string(&args.input).unwrap()).unwrap();
    let results_path = args.results.clone();
    let report = CcApplication::new(args, input).execute().unwrap();

    assert_eq!(report.failures(), 0);
    assert_eq!(report, ResultsReport::read(&results_path).unwrap());

    let reader = record(&report, "FcidumpReader");
    assert_relative_eq!(reader.results["referenceEnergy"], reference_energy(), epsilon = 1e-9);

    let ccsd = record(&report, "ccsd");
    assert_eq!(ccsd.status, "Converged");
    assert_relative_eq!(ccsd.results["energy"], exact_correlation(), epsilon = 1e-8);
    assert_relative_eq!(
        ccsd.results["totalEnergy"],
        reference_energy() + exact_correlation(),
        epsilon = 1e-8
    );

    let triples = record(&report, "PerturbativeTriples");
    assert_relative_eq!(triples.results["energy"], 0.0, epsilon = 1e-12);

    let eom = record(&report, "EomCcsd");
    assert_eq!(eom.status, "Converged");
    let ground = 2.0 * H11 + J11 + exact_correlation();
    let triplet = H11 + H22 + J12 - K12 - ground;
    let singlet = H11 + H22 + J12 + K12 - ground;
    assert_relative_eq!(eom.results["root0"], triplet, epsilon = 1e-6);
    assert_relative_eq!(eom.results["root2"], triplet, epsilon = 1e-6);
    assert_relative_eq!(eom.results["root3"], singlet, epsilon = 1e-6);

    let written = record(&report, "TensorWriter").results["norm"];
    let read = record(&report, "TensorReader").results["norm"];
    assert!(written > 0.0);
    assert_eq!(written, read);

    // saved CCSD amplitudes restart the solve at its fixed point
    assert!(dir.path().join("ccsd_t1.bin").exists());
    assert!(dir.path().join("ccsd_t2.bin").exists());
    let restarted = record(&report, "Ccsd");
    assert_eq!(restarted.status, "Converged");
    assert!(restarted.iterations.unwrap() <= 2);
    assert_relative_eq!(restarted.results["energy"], exact_correlation(), epsilon = 1e-8);

    // one file per root and level, the lowest root seeds a second solve
    for root in 0..4 {
        for level in 1..=2 {
            assert!(dir.path().join(format!("eom_r{root}_t{level}.bin")).exists());
        }
    }
    let seeded = record(&report, "eomccsd");
    assert_eq!(seeded.status, "Converged");
    assert_relative_eq!(seeded.results["root0"], triplet, epsilon = 1e-6);
}

#[test]
fn failed_step_is_recorded_and_later_steps_still_run() {
    let dir = tempdir().unwrap();
    let input = r#"
steps:
  - name: Ccsdtq
    in: {}
  - name: Mp2
    in:
      integrals: Missing
  - name: Delete
    in:
      data: Missing
"#;
    let args = args(dir.path(), input);
    let results_path = args.results.clone();
    let input = parse_input(input).unwrap();
    let result = CcApplication::new(args, input).execute();
    assert!(result.is_err());

    let report = ResultsReport::read(&results_path).unwrap();
    assert_eq!(report.steps.len(), 3);
    assert_eq!(report.failures(), 3);
    assert!(report.steps[0]
        .error
        .as_deref()
        .unwrap()
        .contains("unknown algorithm"));
    assert!(report.steps[1].error.as_deref().unwrap().contains("Missing"));
}

#[test]
fn command_line_iteration_cap_overrides_input() {
    let dir = tempdir().unwrap();
    let fcidump_path = dir.path().join("h2.fcidump");
    fs::write(&fcidump_path, fcidump()).unwrap();
    let input = format!(
        r#"
steps:
  - name: FcidumpReader
    in:
      file: "{}"
    out:
      integrals: Integrals
  - name: Drccd
    in:
      integrals: Integrals
      maxIterations: 50
"#,
        fcidump_path.display()
    );
    let mut args = args(dir.path(), &input);
    args.max_iterations = Some(1);
    args.mixer = Some(MixerType::Linear);
    let input = parse_input(&input).unwrap();
    let report = CcApplication::new(args, input).execute().unwrap();

    let drccd = record(&report, "Drccd");
    assert_eq!(drccd.status, "MaxIterationsExceeded");
    assert_eq!(drccd.iterations, Some(1));
    assert!(drccd.results.contains_key("directEnergy"));
}
