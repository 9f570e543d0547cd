//! # Compiler Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use arm_lib::{
    box_registry::BoxRegistry,
    compiler::{self, MoveChain},
    frame::FrameTransform,
    kin::{ArmKinematics, Kinematics, Params},
};
use comms_if::{
    eqpt::vision::DetectedBox,
    program::{Group, Instruction, Location},
};
use nalgebra::{Point3, Vector3};
use serde_json::json;

fn compile_benchmark(c: &mut Criterion) {
    // ---- Build a dummy arm, board and program ----

    let kin = ArmKinematics::new(Params {
        base_height_m: 0.105,
        shoulder_length_m: 0.135,
        elbow_length_m: 0.147,
        tool_length_m: 0.06,
        camera_offset_m: [-0.025, 0.0, 0.045],
        approach_height_m: 0.04,
        max_abs_pos_rad: [1.5708, 3.1416, 0.0, 1.5708],
        min_abs_pos_rad: [-1.5708, 0.0, -3.1416, -1.5708],
        home_pos_rad: [0.0, 1.5708, -1.5708, -1.5708],
        servo_at_min_deg: [0.0, 180.0, 0.0, 0.0],
        servo_at_max_deg: [180.0, 0.0, 180.0, 180.0],
    });

    let transform = FrameTransform::new(0.3, Vector3::new(0.1, -0.05, 0.0));

    // A 5 by 5 grid of boxes in front of the arm
    let registry = BoxRegistry::new(
        (0..25)
            .map(|i| DetectedBox {
                id: i,
                grab_point_m_w: transform.arm_to_world(&Point3::new(
                    0.12 + 0.02 * (i / 5) as f64,
                    -0.05 + 0.025 * (i % 5) as f64,
                    0.0,
                )),
                corners_px: vec![],
                yaw_rad: 0.0,
            })
            .collect(),
    );

    let groups = vec![Group {
        id: "1".into(),
        name: "odd".into(),
        boxes: (0..25).filter(|i| i % 2 == 1).collect(),
        location: Some(Location {
            x: 10.0,
            y: 20.0,
            z: 2.0,
        }),
    }];

    // Pick and place every box in turn
    let mut script = Vec::new();
    for i in 0..25 {
        script.push(Instruction::new("ungrip", json!({})));
        script.push(Instruction::new("go_box", json!({ "box_id": i })));
        script.push(Instruction::new("grip", json!({})));
        script.push(Instruction::new("go_nearest_box", json!({})));
        script.push(Instruction::new("go_group_box", json!({"group_id": "1"})));
        script.push(Instruction::new("go_group_location", json!({"group_id": "1"})));
        script.push(Instruction::new("wait", json!({ "time": 500 })));
        script.push(Instruction::new("initial", json!({})));
    }

    c.bench_function("compiler::compile", |b| {
        b.iter(|| {
            let mut chain = MoveChain {
                joint_angles: kin.home_joint_angles(),
                reference_point_m_w: Point3::new(0.25, 0.0, 0.1),
            };
            compiler::compile(&script, &groups, &registry, &transform, &mut chain, &kin)
        })
    });
}

criterion_group!(benches, compile_benchmark);
criterion_main!(benches);
