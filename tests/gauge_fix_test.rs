use gaugekit::prelude::*;
use gaugekit::functional::lattice_functional;
use gaugekit::reduce::TraceBuffer;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_gauge(rng: &mut StdRng, amplitude: f64) -> Su3 {
    let mut c = [Complex64::new(0.0, 0.0); gaugekit::consts::TRUE_HERM];
    for v in c.iter_mut() {
        *v = Complex64::new(
            amplitude * (rng.gen::<f64>() - 0.5),
            amplitude * (rng.gen::<f64>() - 0.5),
        );
    }
    Herm(c).expi(1.0)
}

fn scrambled_cold(lat: &Lattice, seed: u64, amplitude: f64) -> LinkField {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut links = LinkField::cold(lat);
    let gauge: Vec<Su3> = (0..lat.volume())
        .map(|_| random_gauge(&mut rng, amplitude))
        .collect();
    links
        .gauge_transform(lat, &gauge)
        .expect("full-volume gauge buffer");
    links
}

fn functional_of(lat: &Lattice, links: &LinkField, kind: GaugeFunctional) -> f64 {
    let mut buf = TraceBuffer::new(lat.volume());
    lattice_functional(lat, links, kind, &mut buf)
}

#[test]
fn landau_recovers_cold_from_a_random_orbit() {
    let lat = Lattice::new([4, 4, 4, 4]).unwrap();
    let mut links = scrambled_cold(&lat, 11, 0.2);
    let start = functional_of(&lat, &links, GaugeFunctional::Linear);
    assert!(start > 1e-6, "scrambling produced a trivial orbit");

    let settings = CgSettings {
        accuracy: 1e-10,
        ..CgSettings::default()
    };
    let report = landau_fix(&lat, &mut links, &settings).unwrap();
    assert!(report.converged(), "theta {}", report.theta());
    assert!(
        report.functional() < 1e-8,
        "functional {}",
        report.functional()
    );
    assert!(report.iters() < settings.max_iters);
}

#[test]
fn landau_without_acceleration_still_converges() {
    let lat = Lattice::new([2, 2, 2, 4]).unwrap();
    let mut links = scrambled_cold(&lat, 29, 0.15);
    let settings = CgSettings {
        accuracy: 1e-9,
        fourier_accelerate: false,
        ..CgSettings::default()
    };
    let report = landau_fix(&lat, &mut links, &settings).unwrap();
    assert!(report.converged(), "theta {}", report.theta());
    assert!(report.functional() < 1e-7);
}

#[test]
fn landau_exact_exponential_matches_the_orbit_minimum() {
    let lat = Lattice::new([2, 2, 2, 2]).unwrap();
    let mut links = scrambled_cold(&lat, 5, 0.1);
    let settings = CgSettings {
        exp_style: ExpStyle::Exact,
        accuracy: 1e-10,
        ..CgSettings::default()
    };
    let report = landau_fix(&lat, &mut links, &settings).unwrap();
    assert!(report.converged());
    assert!(report.functional() < 1e-8);
}

#[test]
fn logarithmic_functional_descends() {
    let lat = Lattice::new([2, 2, 2, 2]).unwrap();
    let mut links = scrambled_cold(&lat, 17, 0.1);
    let start = functional_of(&lat, &links, GaugeFunctional::Logarithmic);
    let settings = CgSettings {
        functional: GaugeFunctional::Logarithmic,
        exp_style: ExpStyle::Exact,
        accuracy: 1e-9,
        max_iters: 200,
        ..CgSettings::default()
    };
    let report = landau_fix(&lat, &mut links, &settings).unwrap();
    assert!(report.functional() < start);
}

#[test]
fn coulomb_fixes_each_slice_independently() {
    let lat = Lattice::new([2, 2, 2, 4]).unwrap();
    let mut links = scrambled_cold(&lat, 43, 0.15);
    let settings = CgSettings {
        accuracy: 1e-10,
        ..CgSettings::default()
    };
    let report = coulomb_fix(&lat, &mut links, &settings).unwrap();
    assert!(report.converged(), "worst theta {}", report.theta());
    assert_eq!(report.history().len(), 4);
    for (t, f) in report.history().iter().enumerate() {
        assert!(*f < 1e-8, "slice {} functional {}", t, f);
    }
}

#[test]
fn fixing_an_already_fixed_configuration_is_a_no_op() {
    let lat = Lattice::new([2, 2, 2, 4]).unwrap();
    let mut links = scrambled_cold(&lat, 59, 0.15);
    let settings = CgSettings {
        accuracy: 1e-10,
        ..CgSettings::default()
    };
    landau_fix(&lat, &mut links, &settings).unwrap();
    let fixed = functional_of(&lat, &links, GaugeFunctional::Linear);
    let report = landau_fix(&lat, &mut links, &settings).unwrap();
    assert!(report.iters() <= 1);
    assert!((report.functional() - fixed).abs() < 1e-10);
}
