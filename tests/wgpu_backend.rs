mod common;

use glamx::Mat4;
use segmap3d::config::DEFAULT_SKY_SURFACE;
use segmap3d::prelude::*;

const W: u32 = 64;
const H: u32 = 32;

fn headless_backend_with(config: &SegmentationConfig) -> Option<WgpuBackend> {
    common::init_logs();
    match pollster::block_on(Context::headless()) {
        Ok(ctxt) => Some(WgpuBackend::new(ctxt, W, H, config)),
        Err(e) => {
            eprintln!("skipping: no GPU adapter available ({})", e);
            None
        }
    }
}

fn headless_backend() -> Option<WgpuBackend> {
    headless_backend_with(&SegmentationConfig {
        uniform_capacity: 4,
        ..SegmentationConfig::default()
    })
}

fn vertex_buffer(ctxt: &Context, label: &str, data: &[u8]) -> wgpu::Buffer {
    let buffer = ctxt.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: data.len() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    ctxt.write_buffer(&buffer, 0, data);
    buffer
}

#[test]
fn override_shader_builds() {
    let Some(mut backend) = headless_backend() else {
        return;
    };
    let mut cache = segmap3d::builtin::OverrideProgramCache::new();
    assert!(cache.ensure_ready(&mut backend).is_some());
    assert!(cache.is_ready());
}

#[test]
fn uniform_capacity_comes_from_config() {
    let config = SegmentationConfig {
        uniform_capacity: 7,
        ..SegmentationConfig::default()
    };
    let Some(backend) = headless_backend_with(&config) else {
        return;
    };
    assert_eq!(backend.uniform_capacity(), 7);
}

#[test]
fn resizing_main_flushes_recorded_work() {
    let Some(mut backend) = headless_backend() else {
        return;
    };
    drop(backend.begin_render_pass("before_resize"));
    backend.resize_main(W / 2, H / 2);
    backend.end_frame();

    assert_eq!(backend.main_target_size(), (W / 2, H / 2));
    let mut pixels = vec![0; buffer_size(W / 2, H / 2)];
    backend
        .read_pixels(None, W / 2, H / 2, &mut pixels)
        .unwrap();
}

#[test]
fn invalid_wgsl_is_reported() {
    let Some(mut backend) = headless_backend() else {
        return;
    };
    let result = backend.compile_shader(ShaderStage::Fragment, "broken", "fn fs_main( {");
    assert!(result.is_err());
}

#[test]
fn segmentation_frame_on_gpu() {
    let Some(backend) = headless_backend() else {
        return;
    };
    let ctxt = backend.context().clone();

    // Two triangles covering the whole viewport.
    let positions: [[f32; 3]; 6] = [
        [-1.0, -1.0, 0.5],
        [1.0, -1.0, 0.5],
        [1.0, 1.0, 0.5],
        [-1.0, -1.0, 0.5],
        [1.0, 1.0, 0.5],
        [-1.0, 1.0, 0.5],
    ];
    let uvs = [[0.0f32; 2]; 6];
    let positions = vertex_buffer(&ctxt, "quad_positions", bytemuck::cast_slice(&positions));
    let uvs = vertex_buffer(&ctxt, "quad_uvs", bytemuck::cast_slice(&uvs));

    let mut renderer = DualPassRenderer::new(backend, SegmentationConfig::default());
    renderer.configure(&ColorSpec::new().sky(&[40, 50, 60]));
    renderer.enable();

    renderer
        .on_render_frame(|hooks| {
            hooks.on_surface_bind(DEFAULT_SKY_SURFACE);
            let backend = hooks.backend();
            let mut pass = backend.begin_render_pass("sky");
            if let Some(draw) = backend.override_draw(Mat4::IDENTITY) {
                draw.bind(&mut pass);
                pass.set_vertex_buffer(0, positions.slice(..));
                pass.set_vertex_buffer(1, uvs.slice(..));
                pass.draw(0..6, 0..1);
            }
            Ok(())
        })
        .unwrap();

    let mut pixels = vec![0; buffer_size(W, H)];
    assert_eq!(renderer.read_frame(W, H, &mut pixels).unwrap(), (W, H));
    assert_eq!(&pixels[..4], &[60, 50, 40, 255]);
    let last = pixels.len() - 4;
    assert_eq!(&pixels[last..], &[60, 50, 40, 255]);

    renderer.shutdown();
    assert_eq!(renderer.targets().size(), None);
}
