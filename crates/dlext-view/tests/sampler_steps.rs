//! Sampler driven over several steps, the way an engine runs it.

use std::cell::RefCell;
use std::rc::Rc;

use dlext_core::{DeviceType, ExecutionSpace, Property};
use dlext_test_utils::MockEngine;
use dlext_view::{ConfigError, FixArgs, PostForceHook, Sampler, SamplerConfig};

fn run_steps(engine: &mut MockEngine, hook: &mut dyn PostForceHook, steps: usize) {
    for _ in 0..steps {
        let step = engine.advance();
        hook.post_force(engine, step).unwrap();
    }
}

#[test]
fn callback_runs_once_per_step_with_counter() {
    let mut engine = MockEngine::new(4, 1);
    let mut sampler = Sampler::new(&engine, SamplerConfig::default()).unwrap();
    let steps = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&steps);
    sampler.set_callback(move |_, step| {
        sink.borrow_mut().push(step);
        Ok(())
    });
    run_steps(&mut engine, &mut sampler, 3);
    assert_eq!(*steps.borrow(), vec![1, 2, 3]);
}

#[test]
fn consumer_forces_accumulate_into_engine() {
    let mut engine = MockEngine::new(2, 1);
    let mut sampler = Sampler::new(&engine, SamplerConfig::default()).unwrap();
    sampler.set_callback(|tensors, _| {
        let forces = tensors.get(Property::Forces).ok_or("forces not exposed")?;
        let p = forces.data_ptr().cast::<f64>();
        for i in 0..6 {
            unsafe { *p.add(i) += 1.0 };
        }
        Ok(())
    });
    run_steps(&mut engine, &mut sampler, 2);
    assert!(engine.host_forces().iter().all(|&f| f == 2.0));
}

#[test]
fn device_sampler_syncs_each_step() {
    let mut engine = MockEngine::new(3, 1).with_accelerator(DeviceType::Cuda, true);
    let config = SamplerConfig::on(ExecutionSpace::Device).with(Property::Types);
    let mut sampler = Sampler::new(&engine, config).unwrap();
    sampler.set_callback(|tensors, _| {
        for (_, t) in tensors.iter() {
            assert_eq!(t.device().kind(), Some(DeviceType::Cuda));
        }
        Ok(())
    });
    run_steps(&mut engine, &mut sampler, 2);
    assert_eq!(engine.sync_log.len(), 8);
    assert_eq!(engine.modified_log.len(), 2);
}

#[test]
fn fix_line_builds_a_working_sampler() {
    let mut engine = MockEngine::new(3, 1).with_accelerator(DeviceType::Cuda, false);
    let args = FixArgs::parse_line("fix dl all dlext space device").unwrap();
    let mut sampler = Sampler::new(&engine, args.into_config()).unwrap();
    sampler.set_callback(|tensors, _| {
        assert!(tensors.iter().all(|(_, t)| t.device().is_cpu()));
        Ok(())
    });
    run_steps(&mut engine, &mut sampler, 1);
}

#[test]
fn missing_map_fails_at_setup_not_at_step() {
    let engine = MockEngine::new(3, 1).without_atom_map();
    let config = SamplerConfig::default().with(Property::TagsMap);
    let err = Sampler::new(&engine, config).unwrap_err();
    assert!(matches!(err, ConfigError::Property(_)));
}

#[test]
fn positions_are_fresh_each_step() {
    let mut engine = MockEngine::new(1, 1).with_accelerator(DeviceType::Cuda, true);
    let config = SamplerConfig::on(ExecutionSpace::Device);
    let mut sampler = Sampler::new(&engine, config).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    sampler.set_callback(move |tensors, _| {
        let x = tensors.get(Property::Positions).ok_or("positions not exposed")?;
        let value = unsafe { *x.data_ptr().cast::<f64>() };
        sink.borrow_mut().push(value);
        Ok(())
    });
    for step in 1..=3 {
        engine.write_host_positions(&[step as f64, 0.0, 0.0]);
        sampler.post_force(&mut engine, step).unwrap();
    }
    assert_eq!(*seen.borrow(), vec![1.0, 2.0, 3.0]);
}
