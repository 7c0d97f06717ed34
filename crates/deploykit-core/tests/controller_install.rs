mod support;

use deploykit_core::controller::{Controller, InstallOptions, UpdateMode};
use deploykit_core::error::DeployError;
use deploykit_core::fleet::{Destination, ModuleSet};
use support::{Event, RecordingRunner, RecordingUploader, builtin_fleet, seeded_fleet};

fn dev() -> Destination {
    Destination::Environment("dev".to_string())
}

#[test]
fn builtin_install_reaches_the_single_dev_backend() {
    let fleet = builtin_fleet();
    let mut runner = RecordingRunner::new();
    let uploader = RecordingUploader::new();

    let modules = fleet.resolve_modules(&["bootstrap"], &[] as &[&str]).unwrap();
    let options = InstallOptions::new(modules, dev()).with_update(UpdateMode::Skip);
    {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.install(&options).unwrap();
    }

    assert_eq!(
        runner.remote_runs(),
        vec![(
            "backend00.dev.company.int".to_string(),
            "sudo ~/deploy-target install -m company-bootstrap".to_string()
        )]
    );
    assert!(matches!(runner.events[0], Event::Capture(_)));
}

#[test]
fn index_refresh_precedes_install_on_each_host() {
    let fleet = seeded_fleet();
    let mut runner = RecordingRunner::new();
    let uploader = RecordingUploader::new();

    let modules = fleet.resolve_modules(&["web"], &[] as &[&str]).unwrap();
    {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        let selections = controller.install(&InstallOptions::new(modules, dev())).unwrap();
        assert_eq!(selections.len(), 2);
    }

    let lines: Vec<String> = runner
        .remote_runs()
        .into_iter()
        .map(|(host, line)| format!("{host}: {line}"))
        .collect();
    assert_eq!(
        lines,
        [
            "backend00.dev.acme.int: sudo ~/deploy-target update",
            "backend00.dev.acme.int: sudo ~/deploy-target install -m acme-bootstrap acme-registry",
            "backend01.dev.acme.int: sudo ~/deploy-target update",
            "backend01.dev.acme.int: sudo ~/deploy-target install -m acme-web",
        ]
    );

    // one version check per host, even with two agent calls each
    let captures = runner
        .events
        .iter()
        .filter(|e| matches!(e, Event::Capture(_)))
        .count();
    assert_eq!(captures, 2);
}

#[test]
fn full_update_mode_passes_flag() {
    let fleet = seeded_fleet();
    let mut runner = RecordingRunner::new();
    let uploader = RecordingUploader::new();

    let modules = fleet.resolve_modules(&["worker"], &[] as &[&str]).unwrap();
    let options = InstallOptions::new(modules, Destination::Host("backend01.dev.acme.int".into()))
        .with_update(UpdateMode::Full);
    {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.install(&options).unwrap();
    }

    let lines: Vec<String> = runner.remote_runs().into_iter().map(|(_, l)| l).collect();
    assert_eq!(
        lines,
        [
            "sudo ~/deploy-target update --full",
            "sudo ~/deploy-target install -m acme-worker",
        ]
    );
}

#[test]
fn first_failure_leaves_later_hosts_untouched() {
    let fleet = seeded_fleet();
    let mut runner = RecordingRunner::new().failing_on("backend00.dev.acme.int 'sudo ~/deploy-target install");
    let uploader = RecordingUploader::new();

    let modules = fleet.resolve_modules(&[] as &[&str], &["all"]).unwrap();
    let options = InstallOptions::new(modules, dev()).with_update(UpdateMode::Skip);
    let result = {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.install(&options)
    };

    assert!(matches!(result, Err(DeployError::CommandFailed { .. })));
    assert_eq!(runner.position("backend01.dev.acme.int"), None);
}

#[test]
fn newer_agent_aborts_before_any_change() {
    let fleet = seeded_fleet();
    let mut runner = RecordingRunner::new().with_agent_version("backend00.dev.acme.int", "2\n");
    let uploader = RecordingUploader::new();

    let modules = fleet.resolve_modules(&["api"], &[] as &[&str]).unwrap();
    let result = {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.install(&InstallOptions::new(modules, dev()))
    };

    match result {
        Err(DeployError::AgentNewer { host, remote, local }) => {
            assert_eq!(host, "backend00.dev.acme.int");
            assert_eq!(remote, 2);
            assert_eq!(local, 1);
        }
        other => panic!("expected AgentNewer, got {other:?}"),
    }
    assert!(runner.runs().is_empty());
}

#[test]
fn older_agent_is_replaced_before_use() {
    let fleet = builtin_fleet();
    let mut runner = RecordingRunner::new().with_agent_version("backend00.dev.company.int", "0");
    let uploader = RecordingUploader::new();

    let modules = fleet.resolve_modules(&["bootstrap"], &[] as &[&str]).unwrap();
    {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.install(&InstallOptions::new(modules, dev())).unwrap();
    }

    let runs = runner.runs();
    assert_eq!(runs[0], "scp deploy-target deploy.toml backend00.dev.company.int:");
    assert!(runs[1].contains("deploy-target update"));
    assert!(runs[2].contains("deploy-target install -m company-bootstrap"));
}

#[test]
fn garbage_version_output_is_an_error() {
    let fleet = builtin_fleet();
    let mut runner =
        RecordingRunner::new().with_agent_version("backend00.dev.company.int", "bash: not found");
    let uploader = RecordingUploader::new();

    let modules = fleet.resolve_modules(&["bootstrap"], &[] as &[&str]).unwrap();
    let result = {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller.install(&InstallOptions::new(modules, dev()))
    };
    assert!(matches!(result, Err(DeployError::InvalidAgentVersion { .. })));
    assert!(runner.runs().is_empty());
}

#[test]
fn empty_module_set_is_rejected() {
    let fleet = builtin_fleet();
    let mut runner = RecordingRunner::new();
    let uploader = RecordingUploader::new();

    let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
    let result = controller.install(&InstallOptions::new(ModuleSet::new(), dev()));
    assert!(matches!(result, Err(DeployError::NoModules)));
}

#[test]
fn push_agent_covers_every_environment_host() {
    let fleet = seeded_fleet();
    let mut runner = RecordingRunner::new();
    let uploader = RecordingUploader::new();

    let hosts = {
        let mut controller = Controller::new(&fleet, &mut runner, &uploader).unwrap();
        controller
            .push_agent(&Destination::Environment("prod".to_string()))
            .unwrap()
    };
    assert_eq!(hosts.len(), 3);
    assert_eq!(
        runner.runs(),
        [
            "scp deploy-target deploy.toml backend00.prod.acme.int:",
            "scp deploy-target deploy.toml backend01.prod.acme.int:",
            "scp deploy-target deploy.toml backend02.prod.acme.int:",
        ]
    );
}
