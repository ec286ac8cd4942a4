use drng::{from_seed, Defaults, SeedOverride};
use drng_reservoir::Reservoir;

const HEX_SEED: &str = "00112233445566778899aabbccddeeff0011223344556677";

fn fixture_rng() -> drng::DeterministicRng {
    let seed = SeedOverride::from_options(None, Some(HEX_SEED))
        .unwrap()
        .unwrap();
    let (rng, _) = from_seed(seed.entropy(), &Defaults::standard().hkdf_info).unwrap();
    rng
}

#[test]
fn test_hex_seed_fixture() {
    let seed = SeedOverride::from_options(None, Some(HEX_SEED))
        .unwrap()
        .unwrap();
    let (mut rng, info) = from_seed(seed.entropy(), &Defaults::standard().hkdf_info).unwrap();

    assert_eq!(
        info.derived.words(),
        [0xbc82c50c5eb6f2fd, 0xe482dce75cb5480a, 0x776c54f509c8d4bb]
    );
    assert_eq!(rng.seed(), info.derived);
    assert_eq!(info.pairs(), vec![("Seed", HEX_SEED.to_string())]);
    assert_eq!(rng.random_float(), 0.15219067736474168);
}

#[test]
fn test_runs_are_reproducible() {
    let lines: Vec<String> = (0..500).map(|i| format!("line {i}")).collect();

    let run = || {
        let mut rng = fixture_rng();
        let pick = rng.random_below(1_000_000).unwrap();
        let mut reservoir = Reservoir::new(10, &mut rng);
        for line in &lines {
            if let Some(slot) = reservoir.offer() {
                reservoir.load(slot, line.clone()).unwrap();
            }
        }
        (pick, reservoir.into_items())
    };

    let (first_pick, first_sample) = run();
    let (second_pick, second_sample) = run();
    assert_eq!(first_pick, second_pick);
    assert_eq!(first_sample, second_sample);
    assert_eq!(first_sample.len(), 10);
}

#[test]
fn test_text_seed_uses_raw_bytes() {
    let text = SeedOverride::from_options(Some("\u{1}\u{2}"), None)
        .unwrap()
        .unwrap();
    let bytes = SeedOverride::from_options(None, Some("0102"))
        .unwrap()
        .unwrap();

    let (_, a) = from_seed(text.entropy(), b"drng seed v1").unwrap();
    let (_, b) = from_seed(bytes.entropy(), b"drng seed v1").unwrap();
    assert_eq!(a.derived, b.derived);
}
