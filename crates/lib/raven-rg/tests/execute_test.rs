mod common;

use std::sync::Arc;

use common::*;
use raven_rg::{
    CacheStats, DepthAccess, PassContext, RenderGraph, RenderQueueRange, RendererListDesc, RgError,
};

/// P0 -> A -> P1 -> B -> P2 -> C -> P3 -> O, every texture with the same description.
fn build_chain(rg: &mut RenderGraph<MockDevice>) {
    let mut a = rg.create_texture(color_desc("A")).unwrap();
    let mut b = rg.create_texture(color_desc("B")).unwrap();
    let mut c = rg.create_texture(color_desc("C")).unwrap();
    let mut o = rg.create_texture(color_desc("O")).unwrap();

    let mut pass = rg.add_pass("P0");
    pass.write_texture(&mut a).unwrap();
    pass.render_fn(record_pass(&[], &[a.read_only()]));

    let mut pass = rg.add_pass("P1");
    pass.read_texture(a).unwrap();
    pass.write_texture(&mut b).unwrap();
    pass.render_fn(record_pass(&[a.read_only()], &[b.read_only()]));

    let mut pass = rg.add_pass("P2");
    pass.read_texture(b).unwrap();
    pass.write_texture(&mut c).unwrap();
    pass.render_fn(record_pass(&[b.read_only()], &[c.read_only()]));

    let mut pass = rg.add_pass("P3");
    pass.read_texture(c).unwrap();
    pass.write_texture(&mut o).unwrap();
    pass.render_fn(record_pass(&[c.read_only()], &[o.read_only()]));

    rg.export(o).unwrap();
}

#[test]
fn execute_in_compiled_order() {
    let mut executor = executor();

    executor.run_frame(&params(), |rg| {
        let mut t = rg.create_texture(color_desc("T")).unwrap();
        let mut o = rg.create_texture(color_desc("O")).unwrap();
        let mut u = rg.create_texture(color_desc("U")).unwrap();

        let mut pass = rg.add_pass("P1");
        pass.write_texture(&mut t).unwrap();
        pass.render_fn(record_pass(&[], &[t.read_only()]));

        let mut pass = rg.add_pass("P2");
        pass.read_texture(t).unwrap();
        pass.write_texture(&mut o).unwrap();
        pass.render_fn(record_pass(&[t.read_only()], &[o.read_only()]));

        let mut pass = rg.add_pass("P3");
        pass.write_texture(&mut u).unwrap();
        pass.render_fn(record_pass(&[], &[u.read_only()]));

        rg.export(o).unwrap();
        Ok(())
    }).unwrap();

    let device = executor.device();
    assert_eq!(device.executed(), vec!["P1", "P2"]);
    assert_eq!(device.created_textures(), vec!["T", "O"]);

    let (seen, _) = device.execution("P2").unwrap();
    assert_eq!(seen[0].1, "P1");
    assert_eq!(executor.frame_index(), 1);
}

#[test]
fn alias_textures_with_disjoint_lifetimes() {
    let mut executor = executor();
    executor.run_frame(&params(), |rg| {
        build_chain(rg);
        Ok(())
    }).unwrap();

    let device = executor.device();
    assert_eq!(device.executed(), vec!["P0", "P1", "P2", "P3"]);
    assert_eq!(device.created_textures(), vec!["A", "B"]);

    let (_, p0_written) = device.execution("P0").unwrap();
    let (p1_seen, p1_written) = device.execution("P1").unwrap();
    let (p2_seen, p2_written) = device.execution("P2").unwrap();
    let (p3_seen, p3_written) = device.execution("P3").unwrap();

    let (a, b, c, o) = (p0_written[0], p1_written[0], p2_written[0], p3_written[0]);

    // A is still read while B is written, so they can't share
    assert_ne!(a, b);
    assert_eq!(c, a);
    assert_eq!(o, b);

    assert_eq!(p1_seen, vec![(a, String::from("P0"))]);
    assert_eq!(p2_seen, vec![(b, String::from("P1"))]);
    assert_eq!(p3_seen, vec![(c, String::from("P2"))]);

    assert_eq!(executor.cache_stats(), CacheStats { hits: 2, misses: 2 });
    assert_eq!(executor.cached_texture_count(), 2);
}

#[test]
fn reuse_textures_across_frames() {
    let mut executor = executor();

    executor.run_frame(&params(), |rg| {
        build_chain(rg);
        Ok(())
    }).unwrap();
    executor.device_mut().clear_events();

    executor.run_frame(&params(), |rg| {
        build_chain(rg);
        Ok(())
    }).unwrap();

    assert!(executor.device().created_textures().is_empty());
    assert_eq!(executor.device().executed(), vec!["P0", "P1", "P2", "P3"]);
    assert_eq!(executor.cache_stats(), CacheStats { hits: 6, misses: 2 });
    assert_eq!(executor.cached_texture_count(), 2);

    // a different resolution means different keys
    executor.run_frame(&raven_rg::ExecuteParams::new(1024, 768), |rg| {
        let mut t = rg.create_texture(depth_desc("full screen depth")).unwrap();
        let mut pass = rg.add_pass("prepass");
        pass.use_depth_output(&mut t, DepthAccess::Write).unwrap();
        pass.render_fn(record_pass(&[], &[t.read_only()]));
        rg.export(t).unwrap();
        Ok(())
    }).unwrap();
    assert_eq!(executor.device().created_textures(), vec!["full screen depth"]);

    let device = executor.shutdown();
    let destroyed = device.events.iter()
        .filter(|event| matches!(event, DeviceEvent::DestroyTexture { .. }))
        .count();
    assert_eq!(destroyed, 3);
}

#[test]
fn stale_read_sees_the_old_content() {
    let mut executor = executor();

    executor.run_frame(&params(), |rg| {
        let mut t = rg.create_texture(color_desc("T")).unwrap();
        let mut out = rg.create_texture(color_desc("out")).unwrap();

        let mut pass = rg.add_pass("first write");
        pass.write_texture(&mut t).unwrap();
        pass.render_fn(record_pass(&[], &[t.read_only()]));
        let first = t.read_only();

        let mut pass = rg.add_pass("second write");
        pass.read_texture(first).unwrap();
        pass.write_texture(&mut t).unwrap();
        pass.render_fn(record_pass(&[first], &[t.read_only()]));

        let mut pass = rg.add_pass("stale reader");
        pass.read_texture(first).unwrap();
        pass.write_texture(&mut out).unwrap();
        pass.render_fn(record_pass(&[first], &[out.read_only()]));

        rg.export(t).unwrap();
        rg.export(out).unwrap();
        Ok(())
    }).unwrap();

    let device = executor.device();
    assert_eq!(device.executed(), vec!["first write", "stale reader", "second write"]);

    let (seen, _) = device.execution("stale reader").unwrap();
    assert_eq!(seen[0].1, "first write");
}

#[test]
fn clear_texture_on_first_use() {
    let mut executor = executor();

    executor.run_frame(&params(), |rg| {
        let history = rg.create_texture(color_desc("history").with_clear([0.0, 0.0, 0.0, 1.0])).unwrap();
        let mut resolved = rg.create_texture(color_desc("resolved")).unwrap();

        let mut pass = rg.add_pass("accumulate");
        pass.read_texture(history).unwrap();
        pass.use_color_output(&mut resolved, 0).unwrap();
        pass.render_fn(record_pass(&[history.read_only()], &[resolved.read_only()]));

        rg.export(resolved).unwrap();
        Ok(())
    }).unwrap();

    let device = executor.device();
    let (seen, _) = device.execution("accumulate").unwrap();
    assert_eq!(seen[0].1, "<clear>");

    let cleared: Vec<_> = device.events.iter()
        .filter_map(|event| match event {
            DeviceEvent::ClearTexture { id, color } => Some((*id, *color)),
            _ => None,
        })
        .collect();
    assert_eq!(cleared, vec![(seen[0].0, [0.0, 0.0, 0.0, 1.0])]);
}

#[test]
fn reject_undeclared_access() {
    let mut executor = executor();

    let err = executor.run_frame(&params(), |rg| {
        let mut declared = rg.create_texture(color_desc("declared")).unwrap();
        let mut hidden = rg.create_texture(color_desc("hidden")).unwrap();

        let mut pass = rg.add_pass("other");
        pass.write_texture(&mut hidden).unwrap();
        pass.render_fn(record_pass(&[], &[]));

        let mut pass = rg.add_pass("sneaky");
        pass.write_texture(&mut declared).unwrap();
        pass.render_fn(record_pass(&[hidden.read_only()], &[]));

        rg.export(declared).unwrap();
        rg.export(hidden).unwrap();
        Ok(())
    }).unwrap_err();

    assert!(matches!(
        err.root_cause().downcast_ref::<RgError>(),
        Some(RgError::UndeclaredAccess { pass, .. }) if pass == "sneaky"
    ));

    // everything went back to the cache even though the frame was dropped
    assert_eq!(executor.cached_texture_count(), 2);
}

#[test]
fn recover_after_failing_pass() {
    let mut executor = executor();

    let err = executor.run_frame(&params(), |rg| {
        let mut a = rg.create_texture(color_desc("A")).unwrap();
        let mut b = rg.create_texture(color_desc("B")).unwrap();

        let mut pass = rg.add_pass("producer");
        pass.write_texture(&mut a).unwrap();
        pass.render_fn(record_pass(&[], &[a.read_only()]));

        let mut pass = rg.add_pass("broken");
        pass.read_texture(a).unwrap();
        pass.write_texture(&mut b).unwrap();
        pass.render_fn(|_ctx| anyhow::bail!("pipeline is not ready"));

        let mut pass = rg.add_pass("after");
        pass.read_texture(b).unwrap();
        pass.never_cull();
        pass.render_fn(record_pass(&[], &[]));
        Ok(())
    }).unwrap_err();

    assert!(format!("{:?}", err).contains("pipeline is not ready"));
    assert_eq!(executor.device().executed(), vec!["producer"]);
    assert_eq!(executor.cached_texture_count(), 2);

    executor.device_mut().clear_events();
    executor.run_frame(&params(), |rg| {
        build_chain(rg);
        Ok(())
    }).unwrap();

    assert!(executor.device().created_textures().is_empty());
    assert_eq!(executor.frame_index(), 2);
}

#[test]
fn drop_frame_when_device_fails() {
    let mut executor = executor();
    executor.device_mut().fail_texture = Some(String::from("B"));

    let err = executor.run_frame(&params(), |rg| {
        build_chain(rg);
        Ok(())
    }).unwrap_err();

    assert!(format!("{:?}", err).contains("out of device memory"));
    assert_eq!(executor.device().executed(), vec!["P0"]);
    assert_eq!(executor.cached_texture_count(), 1);

    executor.device_mut().fail_texture = None;
    executor.device_mut().clear_events();
    executor.run_frame(&params(), |rg| {
        build_chain(rg);
        Ok(())
    }).unwrap();

    // A comes back from the cache
    assert_eq!(executor.device().created_textures(), vec!["B"]);
}

#[test]
fn do_not_run_frame_that_fails_to_compile() {
    let mut executor = executor();

    let err = executor.run_frame(&params(), |rg| {
        drop(rg.add_pass("forgotten"));
        Ok(())
    }).unwrap_err();

    assert_eq!(
        err.root_cause().downcast_ref::<RgError>(),
        Some(&RgError::MissingCallback { pass: String::from("forgotten") })
    );
    assert!(executor.device().events.is_empty());
    assert_eq!(executor.frame_index(), 1);
}

#[derive(Default)]
struct BlurPayload {
    radius: u32,
    weights: Vec<f32>,
}

fn blur_pass(rg: &mut RenderGraph<MockDevice>, name: &str, export: bool) -> (u32, usize) {
    let mut target = rg.create_texture(color_desc(name)).unwrap();

    let mut pass = rg.add_pass(name);
    let mut payload = pass.payload::<BlurPayload>();
    let seen = (payload.radius, payload.weights.len());

    payload.radius = 4;
    payload.weights = vec![0.25; 4];
    pass.write_texture(&mut target).unwrap();
    pass.render(payload, move |payload, ctx| {
        assert_eq!(payload.radius, 4);
        let texture = ctx.texture(target)?;
        ctx.device.contents.insert(texture.id, format!("blur {}", payload.weights.len()));
        Ok(())
    });

    if export {
        rg.export(target).unwrap();
    }
    seen
}

#[test]
fn recycle_pass_payloads() {
    let mut executor = executor();

    executor.run_frame(&params(), |rg| {
        assert_eq!(blur_pass(rg, "blur x", true), (0, 0));
        // culled, its payload goes back to the pool too
        assert_eq!(blur_pass(rg, "blur unused", false), (0, 0));
        Ok(())
    }).unwrap();
    assert_eq!(executor.pooled_payload_count(), 2);

    executor.run_frame(&params(), |rg| {
        // recycled payloads are reset
        assert_eq!(blur_pass(rg, "blur x", true), (0, 0));
        Ok(())
    }).unwrap();
    assert_eq!(executor.pooled_payload_count(), 2);

    // payload-less passes never reach the pool
    executor.run_frame(&params(), |rg| {
        rg.add_pass("side effect").render_fn(|_ctx| Ok(()));
        Ok(())
    }).unwrap();
    assert_eq!(executor.pooled_payload_count(), 2);
}

#[test]
fn keep_pooled_payloads_across_dropped_frames() {
    let mut executor = executor();

    executor.run_frame(&params(), |rg| {
        blur_pass(rg, "blur x", true);
        Ok(())
    }).unwrap();
    assert_eq!(executor.pooled_payload_count(), 1);

    // takes the pooled payload, then fails to compile
    assert!(executor.run_frame(&params(), |rg| {
        blur_pass(rg, "blur x", true);
        drop(rg.add_pass("forgotten"));
        Ok(())
    }).is_err());
    assert_eq!(executor.pooled_payload_count(), 1);
    assert_eq!(executor.frame_index(), 2);

    assert!(executor.run_frame(&params(), |rg| {
        blur_pass(rg, "blur x", true);
        anyhow::bail!("scene is not loaded")
    }).is_err());
    assert_eq!(executor.pooled_payload_count(), 1);
    assert_eq!(executor.frame_index(), 3);

    let mut rg = executor.begin_frame();
    blur_pass(&mut rg, "blur x", true);
    executor.abandon_frame(rg);
    assert_eq!(executor.pooled_payload_count(), 1);
    assert_eq!(executor.frame_index(), 4);

    // nothing but the first frame reached the device
    assert_eq!(executor.device().created_textures(), vec!["blur x"]);
}

#[test]
fn resolve_renderer_lists_and_targets() {
    let mut executor = executor();
    let back_buffer = Arc::new(MockTexture {
        id: 1000,
        key: color_desc("back buffer").resolve(&params()).key,
        name: String::from("back buffer"),
    });

    executor.run_frame(&params(), |rg| {
        let mut color = rg.import_texture(color_desc("back buffer"), back_buffer.clone())?;
        let mut depth = rg.create_texture(depth_desc("depth"))?;

        let mut pass = rg.add_pass("forward opaque");
        let list = pass.create_and_use_renderer_list(
            RendererListDesc::new(&["Forward", "SRPDefaultUnlit"], RenderQueueRange::Opaque).with_name("opaque"),
        )?;
        pass.use_color_output(&mut color, 2)?;
        pass.use_depth_output(&mut depth, DepthAccess::ReadWrite)?;

        pass.render_fn(move |ctx: &mut PassContext<'_, MockDevice>| {
            let renderer_list = ctx.renderer_list(list)?;
            assert_eq!(renderer_list.pass_names, vec!["Forward", "SRPDefaultUnlit"]);
            assert_eq!(ctx.resources.renderer_lists().collect::<Vec<_>>(), vec![list]);

            let outputs: Vec<_> = ctx.resources.color_outputs().collect();
            assert_eq!(outputs, vec![(2, color.read_only())]);
            assert_eq!(ctx.texture(outputs[0].1)?.id, 1000);

            let (depth_output, access) = ctx.resources.depth_output().unwrap();
            assert_eq!(access, DepthAccess::ReadWrite);
            assert_eq!(depth_output, depth.read_only());
            assert_eq!(ctx.texture(depth_output)?.name, "depth");
            Ok(())
        });
        Ok(())
    }).unwrap();

    let device = executor.device();
    assert!(device.events.contains(&DeviceEvent::CreateRendererList { name: String::from("opaque") }));
    assert_eq!(device.created_textures(), vec!["depth"]);

    // imported textures never go through the cache
    assert_eq!(executor.cached_texture_count(), 1);
    assert_eq!(Arc::strong_count(&back_buffer), 1);
}
