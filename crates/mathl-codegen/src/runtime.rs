/// JavaScript math runtime prepended to generated programs.
///
/// Vector constructors hand out arrays from fixed-size ring buffers, so a
/// vector returned by `vec3(...)` stays valid for the next 2047 constructions
/// of the same width only.
pub const JS_RUNTIME: &str = r#"let fract = function(f) { return f - Math.floor(f); };
let abs = Math.abs, sin = Math.sin, cos = Math.cos, tan = Math.tan, log = Math.log, pow = Math.pow;
let acos = Math.acos, asin = Math.asin, atan = Math.atan, atan2 = Math.atan2;
let sqrt = Math.sqrt, exp = Math.exp, min = Math.min, max = Math.max, floor = Math.floor;
let ceil = Math.ceil, sign = Math.sign;

let float = function(f) { return f; };
let int = Math.trunc;
let mod = function(a, b) { return a - b * Math.floor(a / b); };
let step = function(edge, x) { return x < edge ? 0.0 : 1.0; };

function cachering(func, count) {
  this.list = new Array(count);
  this.length = count;

  for (let i = 0; i < this.length; i++) {
    this.list[i] = func();
  }

  this.cur = 0;

  this.next = function() {
    let ret = this.list[this.cur];
    this.cur = (this.cur + 1) % this.length;
    return ret;
  };
}

let vec2cache = new cachering(() => [0, 0], 2048);
function vec2(a, b) {
  let ret = vec2cache.next();
  ret[0] = a;
  ret[1] = b;
  return ret;
}

let vec3cache = new cachering(() => [0, 0, 0], 2048);
function vec3(a, b, c) {
  let ret = vec3cache.next();
  ret[0] = a;
  ret[1] = b;
  ret[2] = c;
  return ret;
}

let vec4cache = new cachering(() => [0, 0, 0, 0], 2048);
function vec4(a, b, c, d) {
  let ret = vec4cache.next();
  ret[0] = a;
  ret[1] = b;
  ret[2] = c;
  ret[3] = d;
  return ret;
}

function dot(a, b) {
  let sum = 0.0;
  for (let i = 0; i < a.length; i++) {
    sum += a[i] * b[i];
  }
  return sum;
}

function cross(a, b) {
  return vec3(a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]);
}

function normalize(a) {
  let len = Math.sqrt(dot(a, a));
  let ret = a.length === 2 ? vec2cache.next() : a.length === 3 ? vec3cache.next() : vec4cache.next();
  for (let i = 0; i < a.length; i++) {
    ret[i] = len > 0.0 ? a[i] / len : 0.0;
  }
  return ret;
}
"#;
