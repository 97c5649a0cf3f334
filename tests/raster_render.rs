use std::rc::Rc;

use image::{Rgba, RgbaImage};
use infograph_renderer::{
    BackgroundImageOptions, BackgroundOptions, CanvasOptions, ColorOptions, DeferredLoader,
    ImageOptions, Infographic, QueueState, Scene, Switch,
};

fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
}

#[test]
fn layers_composite_in_request_order() {
    let loader = Rc::new(DeferredLoader::new());
    loader.insert("green.png", solid(10, 10, [0, 255, 0, 255]));
    loader.insert("blue.png", solid(4, 4, [0, 0, 255, 255]));

    let mut infographic = Infographic::new(loader.clone());
    let canvas = infographic.create_canvas(&CanvasOptions::new(20, 20));

    infographic
        .add_background(&BackgroundOptions {
            color: ColorOptions {
                value: Some(Switch::text("#ff0000")),
                ..Default::default()
            },
            image: BackgroundImageOptions {
                url: Some(Switch::text("green.png")),
                opacity: Some(0.5),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap()
        .add_image(&ImageOptions::new("blue.png", 12.0, 12.0))
        .unwrap();

    assert_eq!(infographic.render(), QueueState::Paused);
    loader.run_until_idle();
    assert_eq!(infographic.queue().state(), QueueState::Idle);

    let image = canvas.borrow().image().clone();
    // Red background only.
    assert_eq!(image.get_pixel(15, 2).0, [255, 0, 0, 255]);
    // Half-transparent green over red.
    let mixed = image.get_pixel(2, 2);
    assert!(mixed[0] > 100 && mixed[0] < 155);
    assert!(mixed[1] > 100 && mixed[1] < 155);
    assert_eq!(mixed[3], 255);
    // Foreground image on top of everything.
    assert_eq!(image.get_pixel(13, 13).0, [0, 0, 255, 255]);
}

#[test]
fn scene_renders_to_png() {
    let loader = Rc::new(DeferredLoader::new());
    loader.insert("tile.png", solid(2, 2, [255, 255, 0, 255]));

    let scene = Scene::from_json(
        r##"{
            "canvas": { "width": 16, "height": 8 },
            "operations": [
                { "type": "background", "color": { "value": "white" } },
                { "type": "background", "pattern": { "url": "tile.png", "repeat": "x", "height": 2 } }
            ]
        }"##,
    )
    .unwrap();
    let (infographic, canvas) = scene.build(loader.clone()).unwrap();
    infographic.render();
    loader.run_until_idle();

    {
        let surface = canvas.borrow();
        assert_eq!(surface.image().get_pixel(14, 1).0, [255, 255, 0, 255]);
        assert_eq!(surface.image().get_pixel(14, 5).0, [255, 255, 255, 255]);
    }

    let path = std::env::temp_dir().join(format!("infograph-scene-{}.png", std::process::id()));
    canvas.borrow().save_png(&path).unwrap();
    let reloaded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(reloaded.dimensions(), (16, 8));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn oversized_background_image_is_clipped_to_the_canvas() {
    let loader = Rc::new(DeferredLoader::new());
    loader.insert("green.png", solid(10, 10, [0, 255, 0, 255]));

    let mut infographic = Infographic::new(loader.clone());
    let canvas = infographic.create_canvas(&CanvasOptions::new(400, 300));
    infographic
        .add_background(&BackgroundOptions {
            image: BackgroundImageOptions {
                url: Some(Switch::text("green.png")),
                width: Some(50_000.0),
                height: Some(50_000.0),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();

    infographic.render();
    loader.run_until_idle();

    assert_eq!(infographic.queue().state(), QueueState::Idle);
    assert_eq!(canvas.borrow().image().get_pixel(399, 299).0, [0, 255, 0, 255]);
}
