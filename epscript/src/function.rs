//! Shading functions defined by function dictionaries: sampled (type 0),
//! exponential interpolation (type 2) and stitching (type 3).

use crate::{
    decode::decode_samples, dictionary::EpsDictionary, operand::Operand, MachineError,
    MachineResult,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub start: f64,
    pub end: f64,
}

impl Domain {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    fn clamp(&self, x: f64) -> f64 {
        if self.start <= self.end {
            x.clamp(self.start, self.end)
        } else {
            x.clamp(self.end, self.start)
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Domains(pub Vec<Domain>);

impl Domains {
    /// Number of domain pairs.
    pub fn n(&self) -> usize {
        self.0.len()
    }

    fn from_numbers(v: &[f64]) -> MachineResult<Self> {
        if v.len() % 2 != 0 {
            return Err(MachineError::RangeCheck);
        }
        Ok(Self(
            v.chunks_exact(2).map(|c| Domain::new(c[0], c[1])).collect(),
        ))
    }
}

/// Function signature, clip input args and returns.
#[derive(Debug, PartialEq, Clone)]
pub struct Signature {
    domain: Domains,
    range: Option<Domains>,
}

impl Signature {
    fn from_dict(d: &EpsDictionary) -> MachineResult<Self> {
        Ok(Self {
            domain: Domains::from_numbers(&d.find_by_name("Domain")?.numbers()?)?,
            range: numbers_entry(d, "Range")?
                .map(|v| Domains::from_numbers(&v))
                .transpose()?,
        })
    }

    pub fn n_args(&self) -> usize {
        self.domain.n()
    }

    pub fn n_returns(&self) -> Option<usize> {
        self.range.as_ref().map(Domains::n)
    }

    fn clip_args(&self, args: &[f64]) -> MachineResult<Vec<f64>> {
        if args.len() != self.n_args() {
            return Err(MachineError::RangeCheck);
        }
        Ok(args
            .iter()
            .zip(self.domain.0.iter())
            .map(|(&arg, domain)| domain.clamp(arg))
            .collect())
    }

    fn clip_returns(&self, returns: Vec<f64>) -> Vec<f64> {
        let Some(range) = self.range.as_ref() else {
            return returns;
        };
        returns
            .iter()
            .zip(range.0.iter())
            .map(|(&ret, domain)| domain.clamp(ret))
            .collect()
    }
}

pub trait Function {
    fn call(&self, args: &[f64]) -> MachineResult<Vec<f64>> {
        let args = self.signature().clip_args(args)?;
        let r = self.inner_call(&args)?;
        Ok(self.signature().clip_returns(r))
    }

    fn signature(&self) -> &Signature;

    /// Called by `self.call()`, args and return value are clipped by signature.
    fn inner_call(&self, args: &[f64]) -> MachineResult<Vec<f64>>;

    /// True if output changes linearly with input, sampling two points is
    /// exact.
    fn is_linear(&self) -> bool {
        false
    }
}

fn numbers_entry(d: &EpsDictionary, key: &str) -> MachineResult<Option<Vec<f64>>> {
    d.get_by_name(key).map(Operand::numbers).transpose()
}

/// Create function from function dictionary.
pub fn function_from_operand(v: &Operand) -> MachineResult<Box<dyn Function>> {
    let d = v.dict_value()?;
    let d = d.borrow();
    match d.find_by_name("FunctionType")?.int()? {
        0 => Ok(Box::new(SampledFunction::from_dict(&d)?)),
        2 => Ok(Box::new(ExponentialInterpolationFunction::from_dict(&d)?)),
        3 => Ok(Box::new(StitchingFunction::from_dict(&d)?)),
        _ => Err(MachineError::Unsupported("function type")),
    }
}

/// Sampled function of one input, samples interpolated linearly.
#[derive(Debug, PartialEq, Clone)]
pub struct SampledFunction {
    signature: Signature,
    encode: Domain,
    decode: Domains,
    size: usize,
    samples: Vec<f64>,
}

impl SampledFunction {
    fn from_dict(d: &EpsDictionary) -> MachineResult<Self> {
        let signature = Signature::from_dict(d)?;
        if signature.n_args() != 1 {
            return Err(MachineError::Unsupported("sampled function with multiple inputs"));
        }
        let range = signature
            .range
            .clone()
            .ok_or(MachineError::Undefined(crate::sname("Range")))?;
        let size = match d.find_by_name("Size")?.numbers()?.as_slice() {
            [n] if *n >= 1.0 => {
                #[allow(clippy::cast_possible_truncation)]
                let n = *n as usize;
                n
            }
            _ => return Err(MachineError::RangeCheck),
        };
        let bits = d.find_by_name("BitsPerSample")?.int()?;
        let bits = u32::try_from(bits).map_err(|_| MachineError::RangeCheck)?;
        let data = d.find_by_name("DataSource")?.string_value()?;
        let samples = decode_samples(&data.bytes()?, bits)?;
        if samples.len() < size * range.n() {
            return Err(MachineError::RangeCheck);
        }
        let encode = match numbers_entry(d, "Encode")?.as_deref() {
            Some([a, b, ..]) => Domain::new(*a, *b),
            _ => Domain::new(0.0, (size - 1) as f64),
        };
        let decode = match numbers_entry(d, "Decode")? {
            Some(v) => Domains::from_numbers(&v)?,
            None => range,
        };
        if decode.n() != signature.n_returns().unwrap_or_default() {
            return Err(MachineError::RangeCheck);
        }
        Ok(Self {
            signature,
            encode,
            decode,
            size,
            samples,
        })
    }

    fn sample(&self, idx: usize, i: usize) -> f64 {
        let n = self.decode.n();
        let decode = &self.decode.0[i];
        let v = self.samples[idx * n + i];
        v.mul_add(decode.end - decode.start, decode.start)
    }
}

impl Function for SampledFunction {
    fn inner_call(&self, args: &[f64]) -> MachineResult<Vec<f64>> {
        let domain = &self.signature.domain.0[0];
        let t = (args[0] - domain.start) / (domain.end - domain.start);
        let e = t
            .mul_add(self.encode.end - self.encode.start, self.encode.start)
            .clamp(0.0, (self.size - 1) as f64);
        #[allow(clippy::cast_possible_truncation)]
        let lo = e.floor() as usize;
        let hi = (lo + 1).min(self.size - 1);
        let frac = e - lo as f64;
        Ok((0..self.decode.n())
            .map(|i| {
                let a = self.sample(lo, i);
                let b = self.sample(hi, i);
                frac.mul_add(b - a, a)
            })
            .collect())
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }
}

pub struct ExponentialInterpolationFunction {
    c0: Vec<f64>,
    c1: Vec<f64>,
    n: f64,
    signature: Signature,
}

impl ExponentialInterpolationFunction {
    fn from_dict(d: &EpsDictionary) -> MachineResult<Self> {
        let c0 = numbers_entry(d, "C0")?.unwrap_or_else(|| vec![0.0]);
        let c1 = numbers_entry(d, "C1")?.unwrap_or_else(|| vec![1.0]);
        if c0.len() != c1.len() {
            return Err(MachineError::RangeCheck);
        }
        Ok(Self {
            c0,
            c1,
            n: d.find_by_name("N")?.real()?,
            signature: Signature::from_dict(d)?,
        })
    }
}

impl Function for ExponentialInterpolationFunction {
    fn inner_call(&self, args: &[f64]) -> MachineResult<Vec<f64>> {
        let x = args[0].powf(self.n);
        Ok(self
            .c0
            .iter()
            .zip(self.c1.iter())
            .map(|(c0, c1)| x.mul_add(c1 - c0, *c0))
            .collect())
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn is_linear(&self) -> bool {
        self.n == 1.0
    }
}

pub struct StitchingFunction {
    functions: Vec<Box<dyn Function>>,
    bounds: Vec<f64>,
    encode: Domains,
    signature: Signature,
}

impl StitchingFunction {
    fn from_dict(d: &EpsDictionary) -> MachineResult<Self> {
        let functions = d
            .find_by_name("Functions")?
            .array_like()?
            .borrow()
            .iter()
            .map(function_from_operand)
            .collect::<MachineResult<Vec<_>>>()?;
        let bounds = d.find_by_name("Bounds")?.numbers()?;
        let encode = Domains::from_numbers(&d.find_by_name("Encode")?.numbers()?)?;
        if functions.is_empty()
            || bounds.len() + 1 != functions.len()
            || encode.n() != functions.len()
        {
            return Err(MachineError::RangeCheck);
        }
        Ok(Self {
            functions,
            bounds,
            encode,
            signature: Signature::from_dict(d)?,
        })
    }

    fn find_function(bounds: &[f64], x: f64) -> usize {
        bounds
            .iter()
            .position(|&bound| x < bound)
            .unwrap_or(bounds.len())
    }

    fn sub_domain(domain: &Domain, bounds: &[f64], idx: usize) -> Domain {
        let start = if idx == 0 {
            domain.start
        } else {
            bounds[idx - 1]
        };
        let end = if idx == bounds.len() {
            domain.end
        } else {
            bounds[idx]
        };
        Domain::new(start, end)
    }

    fn interpolation(a: &Domain, b: &Domain, t: f64) -> f64 {
        let a_len = a.end - a.start;
        if a_len == 0.0 {
            return b.start;
        }
        let t = (t - a.start) / a_len;
        t.mul_add(b.end - b.start, b.start)
    }

    /// Sub function bounds, in input space.
    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }
}

impl Function for StitchingFunction {
    fn inner_call(&self, args: &[f64]) -> MachineResult<Vec<f64>> {
        let x = args[0];
        let idx = Self::find_function(&self.bounds, x);
        let sub_domain = Self::sub_domain(&self.signature.domain.0[0], &self.bounds, idx);
        let x = Self::interpolation(&sub_domain, &self.encode.0[idx], x);
        self.functions[idx].call(&[x])
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn is_linear(&self) -> bool {
        self.functions.len() == 1 && self.functions[0].is_linear()
    }
}

#[cfg(test)]
mod tests;
