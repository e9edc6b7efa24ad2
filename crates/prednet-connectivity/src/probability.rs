// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Motion-prediction connection model.

The source neuron's preferred motion is extrapolated over the time it needs
to cover the source-target offset; the closer the extrapolated position
lands to the target's preferred position, and the closer the two preferred
velocities are, the higher the affinity.

```text
latency = |d_torus(src, tgt)| / |(u_src, v_src)|
x_pred  = x_src + u_src * latency
y_pred  = y_src + v_src * latency
p       = exp(-.5 d(x_pred, x_tgt)²/σx² - .5 d(y_pred, y_tgt)²/σx²)
        * exp(-.5 (u_src-u_tgt)²/σv² - .5 (v_src-v_tgt)²/σv²)
```

Both spatial axes share `σx`. `p` is an unnormalized affinity score and is
not symmetric: latency only depends on the source's speed.
*/

use crate::geometry::{torus_distance, Torus};
use crate::types::{ConnError, ConnResult, ConnectionCandidate, Gid, TuningVector};
use prednet_config::{KernelConfig, KernelForm};

/// Kernel widths and the sheet the positions live on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub sigma_x: f64,
    pub sigma_v: f64,
    pub form: KernelForm,
    pub torus: Torus,
}

impl KernelParams {
    pub fn new(sigma_x: f64, sigma_v: f64) -> Self {
        Self {
            sigma_x,
            sigma_v,
            form: KernelForm::Separable,
            torus: Torus::UNIT,
        }
    }

    pub fn from_config(kernel: &KernelConfig, torus: Torus) -> Self {
        Self {
            sigma_x: kernel.w_sigma_x,
            sigma_v: kernel.w_sigma_v,
            form: kernel.form,
            torus,
        }
    }

    /// Evaluate the model for a concrete source/target pair
    ///
    /// # Errors
    ///
    /// `ConnError::ZeroSourceSpeed` if the source prefers no motion.
    pub fn candidate(
        &self,
        src: Gid,
        src_tuning: &TuningVector,
        tgt: Gid,
        tgt_tuning: &TuningVector,
    ) -> ConnResult<ConnectionCandidate> {
        let affinity = connection_probability(src_tuning, tgt_tuning, self)
            .ok_or(ConnError::ZeroSourceSpeed { src })?;
        Ok(ConnectionCandidate {
            src,
            tgt,
            probability: affinity.p,
            latency: affinity.latency,
        })
    }
}

/// Affinity and predicted travel time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affinity {
    pub p: f64,
    pub latency: f64,
}

/// Directed connection affinity of `src` onto `tgt`.
///
/// Returns `None` when the source speed is zero, where the latency is
/// undefined.
pub fn connection_probability(
    src: &TuningVector,
    tgt: &TuningVector,
    kernel: &KernelParams,
) -> Option<Affinity> {
    let speed = src.speed();
    if speed == 0.0 || !speed.is_finite() {
        return None;
    }

    let torus = kernel.torus;
    let dx = torus_distance(src.x, tgt.x, torus.width);
    let dy = torus_distance(src.y, tgt.y, torus.height);
    let latency = (dx * dx + dy * dy).sqrt() / speed;

    let x_predicted = src.x + src.u * latency;
    let y_predicted = src.y + src.v * latency;
    let dx_pred = torus_distance(x_predicted, tgt.x, torus.width);
    let dy_pred = torus_distance(y_predicted, tgt.y, torus.height);
    let du = src.u - tgt.u;
    let dv = src.v - tgt.v;

    let sx2 = kernel.sigma_x * kernel.sigma_x;
    let sv2 = kernel.sigma_v * kernel.sigma_v;

    let p = match kernel.form {
        KernelForm::Separable => {
            (-0.5 * dx_pred * dx_pred / sx2 - 0.5 * dy_pred * dy_pred / sx2).exp()
                * (-0.5 * du * du / sv2 - 0.5 * dv * dv / sv2).exp()
        }
        KernelForm::Grouped => {
            (-(dx_pred * dx_pred + dy_pred * dy_pred / (2.0 * sx2))).exp()
                * (-(du * du + dv * dv) / (2.0 * sv2)).exp()
        }
    };

    Some(Affinity { p, latency })
}
