mod support;

use std::time::Duration;

use deploykit_core::agent::ServiceAction;
use deploykit_core::controller::{Controller, RestartOptions};
use deploykit_core::error::DeployError;
use deploykit_core::fleet::Destination;
use support::{Event, RecordingRunner, RecordingUploader, builtin_fleet, seeded_fleet};

fn dev() -> Destination {
    Destination::Environment("dev".to_string())
}

#[test]
fn outdated_agent_is_pushed_before_restart() {
    let fleet = builtin_fleet();
    let mut runner = RecordingRunner::new().with_agent_version("backend00.dev.company.int", "0\n");
    let uploader = RecordingUploader::new();

    let modules = fleet.resolve_modules(&["bootstrap"], &[] as &[&str]).unwrap();
    let options = RestartOptions::new(modules, dev()).with_action(ServiceAction::Stop);
    {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.restart(&options).unwrap();
    }

    assert_eq!(
        runner.runs(),
        [
            "scp deploy-target deploy.toml backend00.dev.company.int:",
            "ssh backend00.dev.company.int 'sudo ~/deploy-target restart -a stop -m company-bootstrap'",
        ]
    );
}

#[test]
fn restart_sends_one_call_per_module_without_seed_expansion() {
    let fleet = seeded_fleet();
    let mut runner = RecordingRunner::new();
    let uploader = RecordingUploader::new();

    let modules = fleet.resolve_modules(&["api", "web", "worker"], &[] as &[&str]).unwrap();
    {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.restart(&RestartOptions::new(modules, dev())).unwrap();
    }

    let lines: Vec<String> = runner
        .remote_runs()
        .into_iter()
        .map(|(host, line)| format!("{host}: {line}"))
        .collect();
    assert_eq!(
        lines,
        [
            "backend00.dev.acme.int: sudo ~/deploy-target restart -a restart -m acme-api",
            "backend01.dev.acme.int: sudo ~/deploy-target restart -a restart -m acme-web",
            "backend01.dev.acme.int: sudo ~/deploy-target restart -a restart -m acme-worker",
        ]
    );
}

#[test]
fn cluster_restart_brings_seeds_up_first() {
    let fleet = seeded_fleet();
    let mut runner = RecordingRunner::new();
    let uploader = RecordingUploader::new();

    {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.restart_cluster(&dev()).unwrap();
    }

    let lines: Vec<String> = runner
        .remote_runs()
        .into_iter()
        .map(|(host, line)| format!("{host}: {line}"))
        .collect();
    assert_eq!(
        lines,
        [
            // non-seed modules go down first
            "backend00.dev.acme.int: sudo ~/deploy-target restart -a stop -m acme-api",
            "backend01.dev.acme.int: sudo ~/deploy-target restart -a stop -m acme-web acme-worker",
            // then the seeds
            "backend00.dev.acme.int: sudo ~/deploy-target restart -a stop -m acme-bootstrap acme-registry",
            // seeds come back one at a time on seed hosts
            "backend00.dev.acme.int: sudo ~/deploy-target restart -a start -m acme-bootstrap",
            "backend00.dev.acme.int: sudo ~/deploy-target restart -a start -m acme-registry",
            // then everything else
            "backend00.dev.acme.int: sudo ~/deploy-target restart -a start -m acme-api",
            "backend01.dev.acme.int: sudo ~/deploy-target restart -a start -m acme-web acme-worker",
        ]
    );

    let sleep = runner
        .events
        .iter()
        .position(|e| matches!(e, Event::Sleep(_)))
        .expect("seed delay");
    assert_eq!(runner.events[sleep], Event::Sleep(Duration::from_secs(3)));
    let last_seed_start = runner.position("start -m acme-registry").unwrap();
    let first_main_start = runner.position("start -m acme-api").unwrap();
    assert!(last_seed_start < sleep && sleep < first_main_start);
}

#[test]
fn cluster_restart_checks_every_agent_before_stopping_anything() {
    let fleet = seeded_fleet();
    let mut runner = RecordingRunner::new().with_agent_version("backend01.dev.acme.int", "7");
    let uploader = RecordingUploader::new();

    let result = {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.restart_cluster(&dev())
    };

    assert!(matches!(result, Err(DeployError::AgentNewer { .. })));
    assert!(runner.runs().is_empty());
}

#[test]
fn cluster_restart_from_host_uses_its_environment() {
    let fleet = seeded_fleet();
    let mut runner = RecordingRunner::new();
    let uploader = RecordingUploader::new();

    {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller
            .restart_cluster(&Destination::Host("backend02.prod.acme.int".to_string()))
            .unwrap();
    }

    let hosts: Vec<String> = runner.remote_runs().into_iter().map(|(h, _)| h).collect();
    assert!(hosts.iter().all(|h| h.ends_with(".prod.acme.int")));
    assert!(hosts.iter().any(|h| h == "backend00.prod.acme.int"));
}

#[test]
fn seed_delay_follows_config() {
    let fleet = support::fleet_from(&format!(
        "{}\n[agent]\nseed_delay_secs = 10\n",
        support::SEEDED_FLEET
    ));
    let mut runner = RecordingRunner::new();
    let uploader = RecordingUploader::new();

    {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.restart_cluster(&dev()).unwrap();
    }
    assert!(runner.events.contains(&Event::Sleep(Duration::from_secs(10))));
}
