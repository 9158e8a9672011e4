use std::path::Path;
use std::sync::Mutex;

use tch::{CModule, Device, Kind, Tensor};

use crate::config::DeviceSpec;
use crate::inference::model::{Classifier, InferenceError, LoadError};
use crate::inference::preprocess::ImageTensor;

/// TorchScript classifier. The module takes an NHWC float tensor and returns
/// one score per class.
pub struct TorchClassifier {
    module: Mutex<CModule>,
    device: Device,
}

fn device_for(spec: DeviceSpec) -> Device {
    match spec {
        DeviceSpec::Auto => Device::cuda_if_available(),
        DeviceSpec::Cpu => Device::Cpu,
        DeviceSpec::Cuda => Device::Cuda(0),
    }
}

impl TorchClassifier {
    pub fn load(path: &Path, device: DeviceSpec) -> Result<Self, LoadError> {
        let device = device_for(device);
        let mut module = CModule::load_on_device(path, device).map_err(|e| LoadError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        module.set_eval();
        log::debug!("TorchScript module ready on {:?}", device);
        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }
}

impl Classifier for TorchClassifier {
    fn probabilities(&self, tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let data = tensor
            .as_slice()
            .ok_or_else(|| InferenceError::Backend("input tensor is not contiguous".into()))?;
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let input = Tensor::from_slice(data)
            .view(shape.as_slice())
            .to_device(self.device);

        let module = self
            .module
            .lock()
            .map_err(|_| InferenceError::Backend("model lock poisoned".into()))?;
        let output = tch::no_grad(|| module.forward_ts(&[input]))
            .map_err(|e| InferenceError::Backend(e.to_string()))?;

        let output_flat = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        let num_elements = output_flat.size()[0] as usize;
        let mut output_vec = vec![0.0f32; num_elements];
        output_flat.copy_data(&mut output_vec, num_elements);
        Ok(output_vec)
    }
}
